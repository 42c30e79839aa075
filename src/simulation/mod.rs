//! Simulation control and output analysis
//!
//! # Overview
//!
//! - **SimulationEngine**: event loop of one scenario run
//! - **BatchEstimator**: batch-means grand means and Student-t half-widths
//! - **RunStatistics**: per-center and network output record
//! - **SimulationOrchestrator**: replication and batch-means sweeps
//! - **SimulationError**: error taxonomy of the kernel
//!
//! # Usage Example
//!
//! ```rust
//! use ps_network_simulator::network::Scenario;
//! use ps_network_simulator::random::MultiStreamRng;
//! use ps_network_simulator::simulation::*;
//!
//! let scenario = Scenario::single_server(0.7);
//! let engine = SimulationEngine::new(&scenario, 0.5).unwrap();
//! let mut rng = MultiStreamRng::new(123_456_789);
//!
//! let result = engine
//!     .run(&RunMode::FiniteHorizon { horizon: 1_000.0 }, &mut rng)
//!     .unwrap();
//! assert_eq!(result.counters.external_arrivals, result.counters.exits);
//! ```

pub mod batch;
pub mod engine;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod statistics;
pub mod student_t;

// Re-export all public types for convenience
pub use batch::*;
pub use engine::*;
pub use error::*;
pub use logging::*;
pub use orchestrator::*;
pub use statistics::*;
pub use student_t::*;
