//! Configuration structures for the processor-sharing network simulator
//!
//! This module contains the simulation configuration structure and validation logic
//! used to control the scenario, the estimation methodology and the report output.

use super::{AuthProfile, BalancePolicyKind, BatchTrigger, EstimationMode, OutputFormat, ScenarioKind};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Defaults carried over from the reference study
pub mod defaults {
    /// Seed planted before the first run of a sweep
    pub const SEED: u64 = 123_456_789;

    /// Finite-horizon terminal time (sixteen hours, in seconds)
    pub const HORIZON: f64 = 57_600.0;

    /// Independent replications per arrival rate in finite-horizon mode
    pub const REPLICATIONS: usize = 8;

    /// Reference events per batch
    pub const BATCH_LENGTH: usize = 8192;

    /// Batches per batch-means run
    pub const BATCH_COUNT: usize = 64;

    /// Confidence interval significance level
    pub const ALPHA: f64 = 0.05;

    /// Mean service demand of the single-server scenario
    pub const MEAN_SERVICE: f64 = 0.7;

    /// Front-end replicas in the horizontal scenario
    pub const REPLICAS: usize = 2;

    /// Arrival rates swept when none are given
    pub const ARRIVAL_RATES: [f64; 15] = [
        0.5, 0.55, 0.6, 0.65, 0.7, 0.75, 0.8, 0.85, 0.9, 0.95, 1.0, 1.05, 1.1, 1.15, 1.2,
    ];
}

/// Command line arguments structure
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "ps-network-simulator",
    version = "0.1.0",
    about = "Processor-sharing network simulator - throughput, population, utilization and response-time estimates",
    long_about = "Simulates a multi-tier request-processing network (front end, back end, payment tier) under a processor-sharing discipline and estimates its performance with finite-horizon replications or the batch-means method.

EXAMPLES:
    # Batch-means sweep of the single-server model with default settings
    ps-network-simulator

    # Finite-horizon replications of the web-app network
    ps-network-simulator --scenario web-app --mode finite-horizon --horizon 86400

    # Horizontally scaled front end, two arrival rates, CSV report
    ps-network-simulator --scenario horizontal --arrival-rate 1.0 --arrival-rate 1.4 --output out.csv

    # Use a configuration file
    ps-network-simulator --config config.json

    # Generate configuration template
    ps-network-simulator --print-config > my-config.json

    # Validate configuration without running
    ps-network-simulator --config my-config.json --dry-run

CONFIGURATION:
    Configuration can be provided via:
    1. Command line arguments (highest priority)
    2. Configuration file (--config flag)
    3. Default values (lowest priority)

    Supported configuration file formats: JSON (.json)

    Use --print-config to generate a template configuration file."
)]
pub struct CliArgs {
    /// Configuration file path (JSON format)
    #[arg(
        short,
        long,
        help = "Configuration file path (JSON format)",
        long_help = "Path to a JSON configuration file. CLI arguments will override file settings."
    )]
    pub config: Option<String>,

    /// Network shape to simulate
    #[arg(
        long,
        help = "Scenario (single-server, web-app, horizontal)",
        long_help = "Network shape to simulate. single-server: one PS center; web-app: A-B-A-P-A flow; horizontal: web-app flow with a replicated front end. Default: single-server"
    )]
    pub scenario: Option<String>,

    /// Estimation methodology
    #[arg(long, help = "Estimation mode (finite-horizon or batch-means)")]
    pub mode: Option<String>,

    /// Arrival rates to sweep (repeatable)
    #[arg(
        long = "arrival-rate",
        help = "External arrival rate (repeat to sweep several)",
        long_help = "External arrival rate in jobs per time unit. Repeat the flag to sweep several rates. Must be greater than 0."
    )]
    pub arrival_rates: Vec<f64>,

    /// Finite-horizon terminal time
    #[arg(long, help = "Terminal time for finite-horizon runs")]
    pub horizon: Option<f64>,

    /// Independent replications per arrival rate
    #[arg(long, help = "Replications per arrival rate (finite-horizon)")]
    pub replications: Option<usize>,

    /// Reference events per batch
    #[arg(long, help = "Batch length b (batch-means)")]
    pub batch_length: Option<usize>,

    /// Number of batches
    #[arg(long, help = "Batch count k (batch-means, at least 2)")]
    pub batch_count: Option<usize>,

    /// Event that advances the batch counter
    #[arg(
        long,
        help = "Batch trigger (external-arrivals or completions:<class>)",
        long_help = "Event counted towards closing a batch: external-arrivals, or completions:<class> (for example completions:a3). Default: completions of the scenario's terminal class."
    )]
    pub batch_trigger: Option<String>,

    /// Confidence interval significance level
    #[arg(long, help = "Significance level alpha for confidence intervals")]
    pub alpha: Option<f64>,

    /// Random seed for reproducible results
    #[arg(long, help = "Random seed for reproducible results")]
    pub seed: Option<u64>,

    /// Mean service demand for the single-server scenario
    #[arg(long, help = "Mean service demand of the single-server scenario")]
    pub mean_service: Option<f64>,

    /// Authorization workload profile
    #[arg(long, help = "Authorization profile (basic or extended)")]
    pub auth_profile: Option<String>,

    /// Use the improved back end (halved demand)
    #[arg(long, help = "Use the improved back-end service demand")]
    pub improved_backend: bool,

    /// Front-end replicas in the horizontal scenario
    #[arg(long, help = "Front-end replicas (horizontal scenario)")]
    pub replicas: Option<usize>,

    /// Balancing policy between replicas
    #[arg(long, help = "Balance policy (uniform or coin)")]
    pub balance_policy: Option<String>,

    /// Probability of the first replica under the coin policy
    #[arg(long, help = "Coin probability of the first replica (0.0-1.0)")]
    pub balance_probability: Option<f64>,

    /// Interval between transient samples
    #[arg(long, help = "Record running response times every INTERVAL time units")]
    pub sample_interval: Option<f64>,

    /// Output format for reports
    #[arg(
        long,
        help = "Output format (json or csv)",
        long_help = "Output format for run reports. Supported formats: json, csv. Default: csv"
    )]
    pub output_format: Option<String>,

    /// Report output path
    #[arg(short, long, help = "Report output path (stdout when omitted)")]
    pub output: Option<String>,

    /// Transient samples output path
    #[arg(long, help = "Output path for transient samples (CSV)")]
    pub samples_output: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, help = "Enable debug logging")]
    pub debug: bool,

    /// Directory for daily-rolled JSON log files
    #[arg(long, help = "Also write JSON logs to daily files in DIR")]
    pub log_dir: Option<String>,

    /// Dry run mode - validate configuration without running simulation
    #[arg(long, help = "Validate configuration without running simulation")]
    pub dry_run: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in JSON format and exit")]
    pub print_config: bool,
}

/// Configuration file structure (allows partial configuration)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Network shape to simulate
    pub scenario: Option<ScenarioKind>,
    /// Estimation methodology
    pub mode: Option<EstimationMode>,
    /// Arrival rates to sweep
    pub arrival_rates: Option<Vec<f64>>,
    /// Finite-horizon terminal time
    pub horizon: Option<f64>,
    /// Independent replications per arrival rate
    pub replications: Option<usize>,
    /// Reference events per batch
    pub batch_length: Option<usize>,
    /// Number of batches
    pub batch_count: Option<usize>,
    /// Event that advances the batch counter
    pub batch_trigger: Option<BatchTrigger>,
    /// Confidence interval significance level
    pub alpha: Option<f64>,
    /// Random seed
    pub seed: Option<u64>,
    /// Mean service demand for the single-server scenario
    pub mean_service: Option<f64>,
    /// Authorization workload profile
    pub auth_profile: Option<AuthProfile>,
    /// Use the improved back end
    pub improved_backend: Option<bool>,
    /// Front-end replicas
    pub replicas: Option<usize>,
    /// Balancing policy between replicas
    pub balance_policy: Option<BalancePolicyKind>,
    /// Probability of the first replica under the coin policy
    pub balance_probability: Option<f64>,
    /// Interval between transient samples
    pub sample_interval: Option<f64>,
    /// Output format for reports
    pub output_format: Option<String>,
    /// Report output path
    pub output_path: Option<String>,
    /// Transient samples output path
    pub samples_output: Option<String>,
}

/// Configuration for a simulation sweep
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    /// Network shape to simulate
    pub scenario: ScenarioKind,

    /// Estimation methodology
    pub mode: EstimationMode,

    /// External arrival rates to sweep
    pub arrival_rates: Vec<f64>,

    /// Terminal time for finite-horizon runs
    pub horizon: f64,

    /// Independent replications per arrival rate (finite-horizon)
    pub replications: usize,

    /// Reference events per batch (batch-means)
    pub batch_length: usize,

    /// Number of batches (batch-means)
    pub batch_count: usize,

    /// Event counted towards closing a batch; the scenario's terminal class when unset
    pub batch_trigger: Option<BatchTrigger>,

    /// Significance level for confidence intervals
    pub alpha: f64,

    /// Seed planted before the sweep
    pub seed: u64,

    /// Mean service demand of the single-server scenario
    pub mean_service: f64,

    /// Authorization workload profile
    pub auth_profile: AuthProfile,

    /// Halve the back-end service demand
    pub improved_backend: bool,

    /// Front-end replicas (horizontal scenario)
    pub replicas: usize,

    /// Balancing policy between replicas
    pub balance_policy: BalancePolicyKind,

    /// Probability of the first replica under the coin policy
    pub balance_probability: f64,

    /// Interval between transient samples, disabled when unset
    pub sample_interval: Option<f64>,

    /// Output format for reports
    pub output_format: String,

    /// Report output path, stdout when unset
    pub output_path: Option<String>,

    /// Transient samples output path
    pub samples_output: Option<String>,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Configuration file read error
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unsupported configuration file format
    #[error("Unsupported configuration file format: {0} (supported: .json)")]
    UnsupportedFormat(String),

    /// A command line value could not be parsed
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Name of the offending option
        field: String,
        /// Parser message
        message: String,
    },
}

/// Validation errors for simulation configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    /// No arrival rate to simulate
    #[error("At least one arrival rate is required")]
    NoArrivalRates,

    /// A positive parameter is zero, negative or not finite
    #[error("{field} must be positive and finite, got {value}")]
    NonPositive {
        /// Name of the parameter
        field: String,
        /// The invalid value
        value: f64,
    },

    /// Replication count is invalid
    #[error("Replications must be greater than 0, got {0}")]
    InvalidReplications(usize),

    /// Batch length is invalid
    #[error("Batch length must be greater than 0, got {0}")]
    InvalidBatchLength(usize),

    /// Batch count is invalid
    #[error("Batch count must be at least 2, got {0}")]
    InvalidBatchCount(usize),

    /// Significance level is invalid
    #[error("Alpha must lie strictly between 0.0 and 1.0, got {0}")]
    InvalidAlpha(f64),

    /// Replica count is invalid
    #[error("Replicas must be greater than 0, got {0}")]
    InvalidReplicas(usize),

    /// The coin policy only splits between two replicas
    #[error("Coin balancing requires exactly 2 replicas, got {0}")]
    CoinNeedsTwoReplicas(usize),

    /// A coin that always picks the same replica leaves the other one idle
    #[error("Coin balancing probability must lie strictly between 0.0 and 1.0, got {0}")]
    DegenerateCoin(f64),

    /// Probability value is out of range
    #[error("Invalid probability for {field}: {value} (must be between 0.0 and 1.0)")]
    InvalidProbability {
        /// Name of the field with invalid probability
        field: String,
        /// The invalid probability value
        value: f64,
    },

    /// Output format is not recognised
    #[error("Unknown output format: {0}")]
    InvalidOutputFormat(String),
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            scenario: ScenarioKind::SingleServer,
            mode: EstimationMode::BatchMeans,
            arrival_rates: defaults::ARRIVAL_RATES.to_vec(),
            horizon: defaults::HORIZON,
            replications: defaults::REPLICATIONS,
            batch_length: defaults::BATCH_LENGTH,
            batch_count: defaults::BATCH_COUNT,
            batch_trigger: None,
            alpha: defaults::ALPHA,
            seed: defaults::SEED,
            mean_service: defaults::MEAN_SERVICE,
            auth_profile: AuthProfile::Basic,
            improved_backend: false,
            replicas: defaults::REPLICAS,
            balance_policy: BalancePolicyKind::Coin,
            balance_probability: 0.5,
            sample_interval: None,
            output_format: "csv".to_string(),
            output_path: None,
            samples_output: None,
        }
    }
}

impl SimulationConfig {
    /// Create configuration from parsed CLI arguments
    pub fn from_cli_args(args: CliArgs) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(config_path) = &args.config {
            config = Self::from_file(config_path)?;
        }

        // CLI takes precedence over the file
        Self::apply_cli_overrides(&mut config, args)?;

        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let config_file: ConfigFile = serde_json::from_str(&content)?;
                Ok(Self::from_config_file(config_file))
            }
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat("no extension".to_string())),
        }
    }

    /// Create configuration from a config file, merging with defaults
    fn from_config_file(config_file: ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            scenario: config_file.scenario.unwrap_or(defaults.scenario),
            mode: config_file.mode.unwrap_or(defaults.mode),
            arrival_rates: config_file.arrival_rates.unwrap_or(defaults.arrival_rates),
            horizon: config_file.horizon.unwrap_or(defaults.horizon),
            replications: config_file.replications.unwrap_or(defaults.replications),
            batch_length: config_file.batch_length.unwrap_or(defaults.batch_length),
            batch_count: config_file.batch_count.unwrap_or(defaults.batch_count),
            batch_trigger: config_file.batch_trigger.or(defaults.batch_trigger),
            alpha: config_file.alpha.unwrap_or(defaults.alpha),
            seed: config_file.seed.unwrap_or(defaults.seed),
            mean_service: config_file.mean_service.unwrap_or(defaults.mean_service),
            auth_profile: config_file.auth_profile.unwrap_or(defaults.auth_profile),
            improved_backend: config_file.improved_backend.unwrap_or(defaults.improved_backend),
            replicas: config_file.replicas.unwrap_or(defaults.replicas),
            balance_policy: config_file.balance_policy.unwrap_or(defaults.balance_policy),
            balance_probability: config_file
                .balance_probability
                .unwrap_or(defaults.balance_probability),
            sample_interval: config_file.sample_interval.or(defaults.sample_interval),
            output_format: config_file.output_format.unwrap_or(defaults.output_format),
            output_path: config_file.output_path.or(defaults.output_path),
            samples_output: config_file.samples_output.or(defaults.samples_output),
        }
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(config: &mut Self, args: CliArgs) -> Result<(), ConfigError> {
        if let Some(value) = args.scenario {
            config.scenario = parse_field("scenario", &value)?;
        }
        if let Some(value) = args.mode {
            config.mode = parse_field("mode", &value)?;
        }
        if !args.arrival_rates.is_empty() {
            config.arrival_rates = args.arrival_rates;
        }
        if let Some(value) = args.horizon {
            config.horizon = value;
        }
        if let Some(value) = args.replications {
            config.replications = value;
        }
        if let Some(value) = args.batch_length {
            config.batch_length = value;
        }
        if let Some(value) = args.batch_count {
            config.batch_count = value;
        }
        if let Some(value) = args.batch_trigger {
            config.batch_trigger = Some(parse_field("batch_trigger", &value)?);
        }
        if let Some(value) = args.alpha {
            config.alpha = value;
        }
        if let Some(value) = args.seed {
            config.seed = value;
        }
        if let Some(value) = args.mean_service {
            config.mean_service = value;
        }
        if let Some(value) = args.auth_profile {
            config.auth_profile = parse_field("auth_profile", &value)?;
        }
        if args.improved_backend {
            config.improved_backend = true;
        }
        if let Some(value) = args.replicas {
            config.replicas = value;
        }
        if let Some(value) = args.balance_policy {
            config.balance_policy = parse_field("balance_policy", &value)?;
        }
        if let Some(value) = args.balance_probability {
            config.balance_probability = value;
        }
        if let Some(value) = args.sample_interval {
            config.sample_interval = Some(value);
        }
        if let Some(value) = args.output_format {
            config.output_format = value;
        }
        if let Some(value) = args.output {
            config.output_path = Some(value);
        }
        if let Some(value) = args.samples_output {
            config.samples_output = Some(value);
        }

        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Print configuration as JSON
    pub fn print_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.arrival_rates.is_empty() {
            return Err(ConfigValidationError::NoArrivalRates);
        }
        for rate in &self.arrival_rates {
            self.validate_positive("arrival_rate", *rate)?;
        }

        self.validate_positive("mean_service", self.mean_service)?;

        match self.mode {
            EstimationMode::FiniteHorizon => {
                self.validate_positive("horizon", self.horizon)?;
                if self.replications == 0 {
                    return Err(ConfigValidationError::InvalidReplications(self.replications));
                }
            }
            EstimationMode::BatchMeans => {
                if self.batch_length == 0 {
                    return Err(ConfigValidationError::InvalidBatchLength(self.batch_length));
                }
                if self.batch_count < 2 {
                    return Err(ConfigValidationError::InvalidBatchCount(self.batch_count));
                }
                if !(self.alpha > 0.0 && self.alpha < 1.0) {
                    return Err(ConfigValidationError::InvalidAlpha(self.alpha));
                }
            }
        }

        if self.scenario == ScenarioKind::Horizontal {
            if self.replicas == 0 {
                return Err(ConfigValidationError::InvalidReplicas(self.replicas));
            }
            if self.balance_policy == BalancePolicyKind::Coin && self.replicas != 2 {
                return Err(ConfigValidationError::CoinNeedsTwoReplicas(self.replicas));
            }
        }
        self.validate_probability("balance_probability", self.balance_probability)?;
        if self.scenario == ScenarioKind::Horizontal
            && self.balance_policy == BalancePolicyKind::Coin
            && !(self.balance_probability > 0.0 && self.balance_probability < 1.0)
        {
            return Err(ConfigValidationError::DegenerateCoin(self.balance_probability));
        }

        if let Some(interval) = self.sample_interval {
            self.validate_positive("sample_interval", interval)?;
        }

        self.get_output_format()?;

        Ok(())
    }

    fn validate_positive(&self, field: &str, value: f64) -> Result<(), ConfigValidationError> {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigValidationError::NonPositive { field: field.to_string(), value });
        }
        Ok(())
    }

    fn validate_probability(&self, field: &str, value: f64) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigValidationError::InvalidProbability {
                field: field.to_string(),
                value,
            });
        }
        Ok(())
    }

    /// Get the output format as an enum value
    pub fn get_output_format(&self) -> Result<OutputFormat, ConfigValidationError> {
        self.output_format
            .parse()
            .map_err(|_| ConfigValidationError::InvalidOutputFormat(self.output_format.clone()))
    }

    /// Total number of scenario runs the sweep will perform
    pub fn planned_runs(&self) -> usize {
        match self.mode {
            EstimationMode::FiniteHorizon => self.replications * self.arrival_rates.len(),
            EstimationMode::BatchMeans => self.arrival_rates.len(),
        }
    }
}

fn parse_field<T>(field: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|message| ConfigError::InvalidValue { field: field.to_string(), message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobClass;

    #[test]
    fn test_simulation_config_default() {
        let config = SimulationConfig::default();

        assert_eq!(config.scenario, ScenarioKind::SingleServer);
        assert_eq!(config.mode, EstimationMode::BatchMeans);
        assert_eq!(config.arrival_rates.len(), 15);
        assert_eq!(config.horizon, 57_600.0);
        assert_eq!(config.batch_length, 8192);
        assert_eq!(config.batch_count, 64);
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.seed, 123_456_789);
        assert_eq!(config.mean_service, 0.7);
        assert!(config.batch_trigger.is_none());
        assert!(config.sample_interval.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_cli_parsing_and_overrides() {
        let args = CliArgs::try_parse_from([
            "test",
            "--scenario",
            "horizontal",
            "--mode",
            "finite-horizon",
            "--arrival-rate",
            "1.0",
            "--arrival-rate",
            "1.4",
            "--horizon",
            "1000",
            "--batch-trigger",
            "completions:a3",
            "--improved-backend",
        ])
        .unwrap();

        let config = SimulationConfig::from_cli_args(args).unwrap();
        assert_eq!(config.scenario, ScenarioKind::Horizontal);
        assert_eq!(config.mode, EstimationMode::FiniteHorizon);
        assert_eq!(config.arrival_rates, vec![1.0, 1.4]);
        assert_eq!(config.horizon, 1000.0);
        assert_eq!(config.batch_trigger, Some(BatchTrigger::Completions(JobClass::A3)));
        assert!(config.improved_backend);
        assert_eq!(config.planned_runs(), 16);
    }

    #[test]
    fn test_cli_rejects_unknown_scenario() {
        let args = CliArgs::try_parse_from(["test", "--scenario", "mesh"]).unwrap();
        let err = SimulationConfig::from_cli_args(args).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_config_file_loading() {
        use std::io::Write;
        use tempfile::Builder;

        let mut temp_file = Builder::new().suffix(".json").tempfile().unwrap();
        let config_json = r#"{
            "scenario": "web-app",
            "mode": "batch-means",
            "arrival_rates": [0.8],
            "batch_length": 512,
            "batch_count": 16,
            "batch_trigger": {"kind": "external-arrivals"},
            "auth_profile": "extended",
            "output_format": "json",
            "seed": 12345
        }"#;

        temp_file.write_all(config_json.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = SimulationConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.scenario, ScenarioKind::WebApp);
        assert_eq!(config.arrival_rates, vec![0.8]);
        assert_eq!(config.batch_length, 512);
        assert_eq!(config.batch_count, 16);
        assert_eq!(config.batch_trigger, Some(BatchTrigger::ExternalArrivals));
        assert_eq!(config.auth_profile, AuthProfile::Extended);
        assert_eq!(config.seed, 12345);
        // Untouched fields keep their defaults
        assert_eq!(config.horizon, defaults::HORIZON);
    }

    #[test]
    fn test_config_file_unsupported_extension() {
        let temp_file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = SimulationConfig::from_file(temp_file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = SimulationConfig { sample_interval: Some(300.0), ..Default::default() };
        config.save_to_file(&path).unwrap();
        let reloaded = SimulationConfig::from_file(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_validation_failures() {
        let config = SimulationConfig { arrival_rates: vec![], ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigValidationError::NoArrivalRates)));

        let config = SimulationConfig { arrival_rates: vec![0.5, -1.0], ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigValidationError::NonPositive { .. })));

        let config = SimulationConfig { batch_length: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigValidationError::InvalidBatchLength(0))));

        let config = SimulationConfig { batch_count: 1, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigValidationError::InvalidBatchCount(1))));

        let config = SimulationConfig { alpha: 1.0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigValidationError::InvalidAlpha(_))));

        let config = SimulationConfig {
            mode: EstimationMode::FiniteHorizon,
            horizon: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigValidationError::NonPositive { .. })));

        let config = SimulationConfig {
            scenario: ScenarioKind::Horizontal,
            replicas: 3,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigValidationError::CoinNeedsTwoReplicas(3))));

        let config = SimulationConfig { output_format: "xml".to_string(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigValidationError::InvalidOutputFormat(_))));
    }

    #[test]
    fn test_degenerate_coin_rejected() {
        for p in [0.0, 1.0] {
            let config = SimulationConfig {
                scenario: ScenarioKind::Horizontal,
                balance_probability: p,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ConfigValidationError::DegenerateCoin(_))));
        }

        let config = SimulationConfig {
            scenario: ScenarioKind::Horizontal,
            balance_policy: BalancePolicyKind::Uniform,
            balance_probability: 1.0,
            ..Default::default()
        };
        config.validate().unwrap();

        let config = SimulationConfig { balance_probability: 0.0, ..Default::default() };
        config.validate().unwrap();
    }

    #[test]
    fn test_batch_settings_ignored_in_finite_horizon_mode() {
        let config = SimulationConfig {
            mode: EstimationMode::FiniteHorizon,
            batch_count: 0,
            ..Default::default()
        };
        config.validate().unwrap();
    }
}
