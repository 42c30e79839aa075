//! Processor-Sharing Network Simulator
//!
//! Discrete-event simulation of a multi-tier request-processing network
//! (front end `A`, back end `B`, payment tier `P`) whose centers serve all
//! resident jobs concurrently under processor sharing.
//!
//! # Overview
//!
//! The library estimates throughput, population, utilization and response
//! time of each center and of the whole network, either over independent
//! finite-horizon replications or at steady state with batch means and
//! Student-t confidence intervals.
//!
//! ## Key Features
//!
//! - **Exact processor sharing**: remaining service is apportioned on every event
//! - **Data-driven routing**: one generic center, scenarios are configuration values
//! - **Load-balanced replicas**: uniform or biased-coin choice per routing decision
//! - **Batch means with rebasing**: arbitrarily long runs without unbounded times
//! - **Reproducible streams**: one independent random stream per random quantity
//!
//! ## Quick Start
//!
//! ```rust
//! use ps_network_simulator::*;
//!
//! let config = SimulationConfig {
//!     scenario: ScenarioKind::WebApp,
//!     mode: EstimationMode::FiniteHorizon,
//!     arrival_rates: vec![0.5],
//!     horizon: 2_000.0,
//!     replications: 1,
//!     ..Default::default()
//! };
//!
//! let mut orchestrator = SimulationOrchestrator::new(config)?;
//! let runs = orchestrator.run_all()?;
//! println!("{} metrics", runs[0].result.outcome.metrics().len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: identifiers, enums and configuration
//! - [`random`]: random streams and variates
//! - [`network`]: jobs, centers, clock, routing and scenarios
//! - [`simulation`]: event loop, batch means, sweeps, errors and logging
//! - [`report`]: CSV and JSON-lines writers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │   Types     │    │   Random    │    │   Network   │
//! │             │    │             │    │             │
//! │ Identifiers │◄───┤ Streams     │◄───┤ Centers     │
//! │ Enums       │    │ Variates    │    │ Clock       │
//! │ Config      │    │             │    │ Routing     │
//! └─────────────┘    └─────────────┘    └─────────────┘
//!                                              ▲
//!                                              │
//!                    ┌─────────────┐    ┌─────────────┐
//!                    │   Report    │    │ Simulation  │
//!                    │             │◄───┤             │
//!                    │ CSV / JSONL │    │ Engine      │
//!                    │             │    │ Batch means │
//!                    └─────────────┘    └─────────────┘
//! ```
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod network;
pub mod random;
pub mod report;
pub mod simulation;
pub mod types;

// Core types and identifiers
pub use types::{
    AuthProfile, BalancePolicyKind, BatchTrigger, CenterId, ConfigValidationError, EstimationMode, JobClass,
    OutputFormat, RunId, ScenarioKind, SimulationConfig, StreamId,
};

// Network model
pub use network::{Clock, EventSource, Job, RoutingTable, Scenario, ServiceCenter};

// Random streams
pub use random::{MultiStreamRng, RandomSource, VariateGenerator};

// Simulation and output analysis
pub use simulation::{
    BatchEstimator, BatchMeansSummary, Estimate, RunMode, RunOutcome, RunResult, RunStatistics, ScenarioRun,
    SimulationEngine, SimulationError, SimulationOrchestrator, SimulationResult,
};

// Reports
pub use report::{open_report, CsvReportWriter, JsonLinesWriter, ReportWriter, RunRecord};
