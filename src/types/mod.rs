//! Core types and identifiers for the processor-sharing network simulator
//!
//! This module contains fundamental types, identifiers, and configuration structures
//! used throughout the simulation system.
//!
//! # Overview
//!
//! - **Identifiers**: center and stream indices, UUID-based run identifiers
//! - **Enums**: job classes, scenario shapes, estimation modes, output formats
//! - **Configuration**: simulation configuration with validation and CLI support
//!
//! # Usage Example
//!
//! ```rust
//! use ps_network_simulator::types::*;
//!
//! let config = SimulationConfig {
//!     scenario: ScenarioKind::WebApp,
//!     arrival_rates: vec![0.9],
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! assert_eq!(JobClass::B.service_stream(), StreamId(4));
//! ```

pub mod config;
pub mod enums;
pub mod identifiers;

// Re-export all public types for convenience
pub use config::*;
pub use enums::*;
pub use identifiers::*;
