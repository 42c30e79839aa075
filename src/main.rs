// Processor-Sharing Network Simulator - Main Entry Point
//
// You can run it via Cargo:
//
// ```console
// $ cargo build --release
// $ ./target/release/ps-network-simulator --scenario web-app --mode batch-means
// ```
//
// Or with a configuration file and overrides:
//
// ```console
// $ ./target/release/ps-network-simulator --config sweep.json --arrival-rate 0.9 -o report.csv --verbose
// ```

use anyhow::{Context, Result};
use clap::Parser;
use ps_network_simulator::report::{open_report, open_samples};
use ps_network_simulator::simulation::{LoggingConfig, RunOutcome, ScenarioRun, SimulationOrchestrator, SweepSummary};
use ps_network_simulator::types::config::CliArgs;
use ps_network_simulator::types::{EstimationMode, SimulationConfig};
use std::process;
use tracing::{error, info};

fn main() {
    // Parse CLI arguments first to check for special flags
    let args = CliArgs::parse();

    if args.print_config {
        match SimulationConfig::default().print_json() {
            Ok(json) => {
                println!("{}", json);
                return;
            }
            Err(e) => {
                eprintln!("Failed to serialize default configuration: {}", e);
                process::exit(1);
            }
        }
    }

    let mut logging = LoggingConfig::from_verbosity(args.verbose, args.debug);
    if let Some(dir) = &args.log_dir {
        logging = logging.with_file_logging(dir.clone());
    }
    if let Err(e) = logging.init() {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let dry_run = args.dry_run;
    let config = match load_config(args) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    if dry_run {
        eprintln!("Configuration validation successful!");
        eprintln!("Dry run mode - simulation will not be executed.");
        print_configuration_summary(&config);
        return;
    }

    print_startup_banner(&config);

    if let Err(e) = run_simulation(config) {
        error!("Simulation failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Merge defaults, the optional config file and CLI overrides, then validate
fn load_config(args: CliArgs) -> Result<SimulationConfig> {
    let config = SimulationConfig::from_cli_args(args).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    info!("Configuration loaded and validated successfully");
    Ok(config)
}

/// Run the sweep, streaming every run to the report writers
fn run_simulation(config: SimulationConfig) -> Result<()> {
    let format = config.get_output_format()?;
    let mut report = open_report(config.output_path.as_deref(), format).context("Failed to open report output")?;
    let mut samples = match &config.samples_output {
        Some(path) => Some(open_samples(path).with_context(|| format!("Failed to open samples output '{}'", path))?),
        None => None,
    };

    let mut orchestrator = SimulationOrchestrator::new(config.clone()).context("Failed to build scenario")?;
    let summary = orchestrator
        .run_sweep(|run| {
            report.write_run(run)?;
            if let Some(samples) = samples.as_mut() {
                samples.write_samples(run)?;
            }
            print_run_line(run);
            Ok(())
        })
        .context("Sweep aborted")?;

    report.finish()?;
    if let Some(samples) = samples.as_mut() {
        samples.finish()?;
    }

    print_final_statistics(&config, &summary);
    Ok(())
}

/// Print startup banner and configuration summary
fn print_startup_banner(config: &SimulationConfig) {
    eprintln!("Processor-Sharing Network Simulator");
    eprintln!("===================================");
    eprintln!();
    print_configuration_summary(config);
}

/// Print configuration summary
fn print_configuration_summary(config: &SimulationConfig) {
    eprintln!("Configuration:");
    eprintln!("  Scenario: {}", config.scenario);
    eprintln!("  Mode: {}", config.mode);
    eprintln!(
        "  Arrival Rates: {}",
        config.arrival_rates.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
    );
    match config.mode {
        EstimationMode::FiniteHorizon => {
            eprintln!("  Horizon: {}", config.horizon);
            eprintln!("  Replications: {}", config.replications);
        }
        EstimationMode::BatchMeans => {
            eprintln!("  Batch Length: {}", config.batch_length);
            eprintln!("  Batch Count: {}", config.batch_count);
            eprintln!("  Confidence: {:.1}%", (1.0 - config.alpha) * 100.0);
            match &config.batch_trigger {
                Some(trigger) => eprintln!("  Batch Trigger: {}", trigger),
                None => eprintln!("  Batch Trigger: terminal-class completions"),
            }
        }
    }
    eprintln!("  Auth Profile: {}", config.auth_profile);
    if config.improved_backend {
        eprintln!("  Back End: improved");
    }
    eprintln!("  Replicas: {} ({})", config.replicas, config.balance_policy);
    if let Some(interval) = config.sample_interval {
        eprintln!("  Sample Interval: {}", interval);
    }
    eprintln!("  Output Format: {}", config.output_format);
    eprintln!("  Random Seed: {}", config.seed);
    eprintln!("  Planned Runs: {}", config.planned_runs());
    eprintln!();
}

/// One progress line per completed run
fn print_run_line(run: &ScenarioRun) {
    let response = match &run.result.outcome {
        RunOutcome::FiniteHorizon(stats) => format!("{:.4}", stats.response_time),
        RunOutcome::BatchMeans(summary) => match summary.estimate("network_response_time") {
            Some(estimate) => format!("{:.4} +/- {:.4}", estimate.mean, estimate.half_width),
            None => "n/a".to_string(),
        },
    };
    let replication = run.replication.map(|r| format!(" replication {}", r)).unwrap_or_default();
    eprintln!("  rate {:<5}{} response time {}", run.arrival_rate, replication, response);
}

/// Print final sweep statistics
fn print_final_statistics(config: &SimulationConfig, summary: &SweepSummary) {
    eprintln!();
    eprintln!("Simulation Complete");
    eprintln!("===================");
    eprintln!("  Runs: {}", summary.runs);
    eprintln!("  Events: {}", summary.events);
    eprintln!("  Runtime: {:.2} seconds", summary.duration.as_secs_f64());
    eprintln!("  Events per Second: {:.0}", summary.events_per_second());
    if let Some(path) = &config.output_path {
        eprintln!("  Report: {}", path);
    }
    if let Some(path) = &config.samples_output {
        eprintln!("  Samples: {}", path);
    }
}
