//! Enumeration types for the processor-sharing network simulator
//!
//! This module contains all enumeration types used throughout the simulation system,
//! including job classes, scenario shapes, estimation modes, and output formats.

use crate::types::StreamId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Class of a job in flight
///
/// The class encodes where a request is in its path through the network:
/// a fresh request (`A1`) is handled by the front end, forwarded to the
/// back end (`B`), returns to the front end (`A2`), is authorized by the
/// payment tier (`P`) and finally returns to the front end (`A3`) before
/// leaving the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JobClass {
    /// First visit to the front end
    A1,
    /// Second visit to the front end, after the back end
    A2,
    /// Third visit to the front end, after payment authorization
    A3,
    /// Back-end processing
    B,
    /// Payment/authorization processing
    P,
}

impl JobClass {
    /// Every class, in stream order
    pub const ALL: [JobClass; 5] = [JobClass::A1, JobClass::A2, JobClass::A3, JobClass::B, JobClass::P];

    /// Random stream dedicated to this class's service demand
    pub fn service_stream(self) -> StreamId {
        match self {
            JobClass::A1 => StreamId(1),
            JobClass::A2 => StreamId(2),
            JobClass::A3 => StreamId(3),
            JobClass::B => StreamId(4),
            JobClass::P => StreamId(5),
        }
    }
}

impl fmt::Display for JobClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobClass::A1 => write!(f, "A1"),
            JobClass::A2 => write!(f, "A2"),
            JobClass::A3 => write!(f, "A3"),
            JobClass::B => write!(f, "B"),
            JobClass::P => write!(f, "P"),
        }
    }
}

impl FromStr for JobClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a1" => Ok(JobClass::A1),
            "a2" => Ok(JobClass::A2),
            "a3" => Ok(JobClass::A3),
            "b" => Ok(JobClass::B),
            "p" => Ok(JobClass::P),
            _ => Err(format!("Unknown job class: {}", s)),
        }
    }
}

/// Network shape to simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    /// One processor-sharing center, jobs leave after a single visit
    SingleServer,
    /// Front end, back end and payment tier in the A-B-A-P-A flow
    WebApp,
    /// The web-app flow with the front end replicated behind a balancer
    Horizontal,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioKind::SingleServer => write!(f, "single-server"),
            ScenarioKind::WebApp => write!(f, "web-app"),
            ScenarioKind::Horizontal => write!(f, "horizontal"),
        }
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single-server" | "single" | "ps" => Ok(ScenarioKind::SingleServer),
            "web-app" | "webapp" | "tandem" => Ok(ScenarioKind::WebApp),
            "horizontal" | "horizontal-a" => Ok(ScenarioKind::Horizontal),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

/// Output-analysis methodology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EstimationMode {
    /// Independent replications stopped at a fixed horizon
    FiniteHorizon,
    /// One long run split into batches, steady-state estimates
    BatchMeans,
}

impl fmt::Display for EstimationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimationMode::FiniteHorizon => write!(f, "finite-horizon"),
            EstimationMode::BatchMeans => write!(f, "batch-means"),
        }
    }
}

impl FromStr for EstimationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "finite-horizon" | "finite" => Ok(EstimationMode::FiniteHorizon),
            "batch-means" | "batch" => Ok(EstimationMode::BatchMeans),
            _ => Err(format!("Unknown estimation mode: {}", s)),
        }
    }
}

/// Authorization workload profile for the payment tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthProfile {
    /// Single-step authorization (A3 0.1, P 0.4)
    Basic,
    /// Strengthened authorization (A3 0.15, P 0.7)
    Extended,
}

impl fmt::Display for AuthProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthProfile::Basic => write!(f, "basic"),
            AuthProfile::Extended => write!(f, "extended"),
        }
    }
}

impl FromStr for AuthProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" | "1" => Ok(AuthProfile::Basic),
            "extended" | "2" => Ok(AuthProfile::Extended),
            _ => Err(format!("Unknown auth profile: {}", s)),
        }
    }
}

/// How a balanced destination picks one of its replicas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BalancePolicyKind {
    /// Equilikely choice over all replicas
    Uniform,
    /// Bernoulli coin between exactly two replicas
    Coin,
}

impl fmt::Display for BalancePolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalancePolicyKind::Uniform => write!(f, "uniform"),
            BalancePolicyKind::Coin => write!(f, "coin"),
        }
    }
}

impl FromStr for BalancePolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uniform" => Ok(BalancePolicyKind::Uniform),
            "coin" | "bernoulli" => Ok(BalancePolicyKind::Coin),
            _ => Err(format!("Unknown balance policy: {}", s)),
        }
    }
}

/// Event counted towards closing a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "class")]
pub enum BatchTrigger {
    /// Completions of the given class at any center
    Completions(JobClass),
    /// External arrivals into the network
    ExternalArrivals,
}

impl fmt::Display for BatchTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchTrigger::Completions(class) => write!(f, "completions:{}", class),
            BatchTrigger::ExternalArrivals => write!(f, "external-arrivals"),
        }
    }
}

impl FromStr for BatchTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        if lowered == "external-arrivals" || lowered == "arrivals" {
            return Ok(BatchTrigger::ExternalArrivals);
        }
        match lowered.strip_prefix("completions:") {
            Some(class) => Ok(BatchTrigger::Completions(class.parse()?)),
            None => Err(format!("Unknown batch trigger: {}", s)),
        }
    }
}

/// Output formats for simulation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    /// JSON lines, one record per run
    Json,
    /// CSV format for tabular data
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::Csv => write!(f, "CSV"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}
