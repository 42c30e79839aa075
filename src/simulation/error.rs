//! Error types and handling
//!
//! This module contains error types and error handling for the simulation.
//! Every error aborts the current run; nothing here is retried, because a run
//! whose bookkeeping went wrong cannot be continued safely.

use crate::types::{CenterId, ConfigValidationError};
use thiserror::Error;

/// Errors that can occur during simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ConfigurationError(String),

    /// Scenario topology is inconsistent
    #[error("Invalid routing table: {0}")]
    RoutingError(String),

    /// Accounting invariant broken inside the kernel
    #[error("Invariant violation at {center}: {detail}")]
    InvariantViolation {
        /// Center (or clock) where the violation was detected
        center: String,
        /// What went wrong
        detail: String,
    },

    /// A statistic would require dividing by zero
    #[error("Degenerate statistics at {center}: {detail}")]
    DegenerateStatistics {
        /// Center whose statistic is undefined
        center: String,
        /// Which statistic and why
        detail: String,
    },

    /// Variate generator called with an out-of-domain parameter
    #[error("Invalid variate parameter: {0}")]
    InvalidVariateParameter(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<ConfigValidationError> for SimulationError {
    fn from(error: ConfigValidationError) -> Self {
        SimulationError::ConfigurationError(error.to_string())
    }
}

impl SimulationError {
    /// Create a configuration error
    pub fn configuration_error(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create a routing error
    pub fn routing_error(msg: impl Into<String>) -> Self {
        Self::RoutingError(msg.into())
    }

    /// Create an invariant violation attributed to a center
    pub fn invariant(center: CenterId, detail: impl Into<String>) -> Self {
        Self::InvariantViolation { center: center.to_string(), detail: detail.into() }
    }

    /// Create an invariant violation attributed to the clock
    pub fn clock_invariant(detail: impl Into<String>) -> Self {
        Self::InvariantViolation { center: "clock".to_string(), detail: detail.into() }
    }

    /// Create a degenerate statistics error
    pub fn degenerate(center: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::DegenerateStatistics { center: center.into(), detail: detail.into() }
    }

    /// Create an invalid variate parameter error
    pub fn invalid_variate(msg: impl Into<String>) -> Self {
        Self::InvalidVariateParameter(msg.into())
    }

    /// Whether the sweep may move on to the next run after this error
    ///
    /// Output failures and degenerate statistics leave the kernel intact; a
    /// broken invariant or bad configuration does not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SimulationError::ConfigurationError(_) => false,
            SimulationError::RoutingError(_) => false,
            SimulationError::InvariantViolation { .. } => false,
            SimulationError::DegenerateStatistics { .. } => true,
            SimulationError::InvalidVariateParameter(_) => false,
            SimulationError::IoError(_) => true,
            SimulationError::SerializationError(_) => true,
        }
    }

    /// Get the error category
    pub fn category(&self) -> &'static str {
        match self {
            SimulationError::ConfigurationError(_) => "Configuration",
            SimulationError::RoutingError(_) => "Routing",
            SimulationError::InvariantViolation { .. } => "Invariant",
            SimulationError::DegenerateStatistics { .. } => "Statistics",
            SimulationError::InvalidVariateParameter(_) => "Variate",
            SimulationError::IoError(_) => "IO",
            SimulationError::SerializationError(_) => "Serialization",
        }
    }
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;
