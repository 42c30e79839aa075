//! Sweep driver
//!
//! The orchestrator owns the random source and turns a validated
//! configuration into a sequence of independent scenario runs:
//!
//! - **finite-horizon**: `replications` super-runs, each replaying every
//!   arrival rate from the super-run's seed; the seed of the next super-run is
//!   taken from the generator with `get_seed()`
//! - **batch-means**: one long run per arrival rate, all from the configured seed

use super::{RunMode, RunResult, SimulationEngine, SimulationError, SimulationResult};
use crate::network::Scenario;
use crate::perf_span;
use crate::random::{MultiStreamRng, RandomSource};
use crate::types::{EstimationMode, RunId, ScenarioKind, SimulationConfig};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

/// One completed scenario run with the parameters that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRun {
    /// Correlation id for reports
    pub run_id: RunId,
    /// Network shape
    pub scenario: ScenarioKind,
    /// Output-analysis method
    pub mode: EstimationMode,
    /// Super-run index, finite-horizon only
    pub replication: Option<usize>,
    /// Seed planted before the run
    pub seed: u64,
    /// External arrival rate
    pub arrival_rate: f64,
    /// What the run produced
    pub result: RunResult,
}

/// Totals over a whole sweep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepSummary {
    /// Scenario runs completed
    pub runs: usize,
    /// Events dispatched over every run
    pub events: u64,
    /// Wall-clock time of the sweep
    pub duration: Duration,
}

impl SweepSummary {
    fn record(&mut self, run: &ScenarioRun) {
        self.runs += 1;
        self.events += run.result.events;
    }

    /// Dispatched events per wall-clock second
    pub fn events_per_second(&self) -> f64 {
        let seconds = self.duration.as_secs_f64();
        if seconds > 0.0 {
            self.events as f64 / seconds
        } else {
            0.0
        }
    }
}

/// Drives every run a configuration asks for
#[derive(Debug)]
pub struct SimulationOrchestrator<R: RandomSource = MultiStreamRng> {
    config: SimulationConfig,
    scenario: Scenario,
    mode: RunMode,
    rng: R,
}

impl SimulationOrchestrator<MultiStreamRng> {
    /// Validate `config` and build its scenario with a ChaCha-backed source
    #[instrument(skip(config), fields(scenario = %config.scenario, mode = %config.mode))]
    pub fn new(config: SimulationConfig) -> SimulationResult<Self> {
        let rng = MultiStreamRng::new(config.seed);
        Self::with_rng(config, rng)
    }
}

impl<R: RandomSource> SimulationOrchestrator<R> {
    /// Validate `config` and build its scenario around an existing source
    pub fn with_rng(config: SimulationConfig, rng: R) -> SimulationResult<Self> {
        config.validate()?;
        let scenario = Scenario::from_config(&config)?;
        let mode = RunMode::from_config(&config, &scenario)?;
        info!(
            centers = scenario.center_count(),
            runs = config.planned_runs(),
            "orchestrator ready"
        );
        Ok(Self { config, scenario, mode, rng })
    }

    /// Scenario every run simulates
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Stopping rule and output analysis of every run
    pub fn mode(&self) -> &RunMode {
        &self.mode
    }

    /// Configuration the orchestrator was built from
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Plant `seed` and run the scenario once at `arrival_rate`
    pub fn run_single(
        &mut self,
        seed: u64,
        arrival_rate: f64,
        replication: Option<usize>,
    ) -> SimulationResult<ScenarioRun> {
        self.rng.plant_seeds(seed);
        let engine = SimulationEngine::new(&self.scenario, arrival_rate)?.with_sampling(self.config.sample_interval)?;
        let result = engine.run(&self.mode, &mut self.rng).map_err(|e| {
            error!(
                category = e.category(),
                seed,
                arrival_rate,
                "run failed: {}",
                e
            );
            e
        })?;

        Ok(ScenarioRun {
            run_id: RunId::new(),
            scenario: self.scenario.kind,
            mode: self.config.mode,
            replication,
            seed,
            arrival_rate,
            result,
        })
    }

    /// Run the whole sweep, handing every completed run to `sink`
    pub fn run_sweep<F>(&mut self, mut sink: F) -> SimulationResult<SweepSummary>
    where
        F: FnMut(&ScenarioRun) -> SimulationResult<()>,
    {
        let span = perf_span!(
            "sweep",
            scenario = tracing::field::display(self.scenario.kind),
            runs = self.config.planned_runs(),
        );
        let _enter = span.enter();

        let started = Instant::now();
        let mut summary = SweepSummary::default();
        let rates = self.config.arrival_rates.clone();

        match self.config.mode {
            EstimationMode::FiniteHorizon => {
                let mut seed = self.config.seed;
                for replication in 0..self.config.replications {
                    for &rate in &rates {
                        let run = self.run_single(seed, rate, Some(replication))?;
                        summary.record(&run);
                        sink(&run)?;
                    }
                    seed = self.rng.get_seed();
                }
            }
            EstimationMode::BatchMeans => {
                for &rate in &rates {
                    let run = self.run_single(self.config.seed, rate, None)?;
                    summary.record(&run);
                    sink(&run)?;
                }
            }
        }

        summary.duration = started.elapsed();
        info!(
            runs = summary.runs,
            events = summary.events,
            seconds = summary.duration.as_secs_f64(),
            "sweep finished"
        );
        Ok(summary)
    }

    /// Run the whole sweep and keep every result
    pub fn run_all(&mut self) -> SimulationResult<Vec<ScenarioRun>> {
        let mut runs = Vec::with_capacity(self.config.planned_runs());
        self.run_sweep(|run| {
            runs.push(run.clone());
            Ok(())
        })?;
        if runs.is_empty() {
            return Err(SimulationError::configuration_error("sweep produced no runs"));
        }
        Ok(runs)
    }
}
