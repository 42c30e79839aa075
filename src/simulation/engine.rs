//! Event loop of one scenario run
//!
//! Every iteration selects the earliest scheduled event together with its
//! source, brings every center up to that instant, moves the clock and
//! dispatches exactly one handler. A finite-horizon run ends when no arrival
//! remains within the horizon and every center has drained; a batch-means
//! run ends once the estimator holds all its batches.

use super::{BatchEstimator, BatchMeansSummary, RunStatistics, SimulationError, SimulationResult, TransientSample};
use crate::network::{Clock, EventSource, Job, Scenario, ServiceCenter, UNSCHEDULED};
use crate::random::{RandomSource, VariateGenerator};
use crate::sim_event;
use crate::types::{BatchTrigger, CenterId, EstimationMode, JobClass, SimulationConfig, StreamId};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

/// How a run is stopped and its output analysed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RunMode {
    /// Stop admitting arrivals at `horizon`, drain, report one record
    FiniteHorizon {
        /// Last instant at which external arrivals are admitted
        horizon: f64,
    },
    /// Collect `batch_count` batches of `batch_length` reference events
    BatchMeans {
        /// Reference events per batch
        batch_length: usize,
        /// Batches to collect
        batch_count: usize,
        /// Significance level of the confidence intervals
        alpha: f64,
        /// Which events count towards a batch
        trigger: BatchTrigger,
    },
}

impl RunMode {
    /// Mode requested by `config`, defaulting the trigger to the scenario's reference class
    ///
    /// A batch trigger that can never fire in `scenario` is a configuration error.
    pub fn from_config(config: &SimulationConfig, scenario: &Scenario) -> SimulationResult<Self> {
        let mode = match config.mode {
            EstimationMode::FiniteHorizon => RunMode::FiniteHorizon { horizon: config.horizon },
            EstimationMode::BatchMeans => {
                let trigger = config
                    .batch_trigger
                    .unwrap_or(BatchTrigger::Completions(scenario.reference_class));
                scenario.check_batch_trigger(trigger)?;
                RunMode::BatchMeans {
                    batch_length: config.batch_length,
                    batch_count: config.batch_count,
                    alpha: config.alpha,
                    trigger,
                }
            }
        };
        Ok(mode)
    }
}

/// Poisson stream of external arrivals
#[derive(Debug, Clone)]
pub struct ArrivalProcess {
    rate: f64,
    last_arrival: f64,
}

impl ArrivalProcess {
    /// Arrivals at `rate` per unit time, starting from time zero
    pub fn new(rate: f64) -> SimulationResult<Self> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(SimulationError::configuration_error(format!(
                "arrival rate must be positive, got {}",
                rate
            )));
        }
        Ok(Self { rate, last_arrival: 0.0 })
    }

    /// Draw the next arrival time from the arrivals stream
    pub fn next_arrival<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> SimulationResult<f64> {
        rng.select_stream(StreamId::ARRIVALS);
        self.last_arrival += rng.exponential(1.0 / self.rate)?;
        Ok(self.last_arrival)
    }

    /// Translate the last arrival time by `-instant`
    pub fn rebase(&mut self, instant: f64) {
        self.last_arrival -= instant;
    }

    /// Arrival rate
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Time of the most recently drawn arrival
    pub fn last_arrival(&self) -> f64 {
        self.last_arrival
    }
}

/// Job flow through the network boundary and between centers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCounters {
    /// Jobs admitted from outside
    pub external_arrivals: u64,
    /// Jobs handed from one center to another
    pub routed: u64,
    /// Jobs that left the network
    pub exits: u64,
}

/// Lifetime job counts of one center at the end of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterTotals {
    /// Center name
    pub name: String,
    /// Jobs accepted since the start of the run
    pub arrivals: u64,
    /// Jobs completed since the start of the run
    pub departures: u64,
    /// Jobs still resident
    pub resident: usize,
}

/// A named output metric, paired with its half-width in batch-means mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Field name
    pub name: String,
    /// Point estimate
    pub value: f64,
    /// Confidence half-width, batch-means only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub half_width: Option<f64>,
}

/// Output analysis of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// One record over the whole finite-horizon run
    FiniteHorizon(RunStatistics),
    /// Grand means and half-widths over all batches
    BatchMeans(BatchMeansSummary),
}

impl RunOutcome {
    /// Named metrics in record order
    pub fn metrics(&self) -> Vec<Metric> {
        match self {
            RunOutcome::FiniteHorizon(stats) => stats
                .field_names()
                .into_iter()
                .zip(stats.values())
                .map(|(name, value)| Metric { name, value, half_width: None })
                .collect(),
            RunOutcome::BatchMeans(summary) => summary
                .field_names
                .iter()
                .zip(&summary.estimates)
                .map(|(name, estimate)| Metric {
                    name: name.clone(),
                    value: estimate.mean,
                    half_width: Some(estimate.half_width),
                })
                .collect(),
        }
    }
}

/// Everything a run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Output analysis
    pub outcome: RunOutcome,
    /// Transient samples, empty unless sampling was requested
    pub samples: Vec<TransientSample>,
    /// Network boundary and routing counts
    pub counters: NetworkCounters,
    /// Lifetime counts per center
    pub centers: Vec<CenterTotals>,
    /// Events dispatched
    pub events: u64,
}

/// Handler dispatched by one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// External arrival
    Arrival,
    /// Completion of a job of `class` at `center`
    Completion {
        /// Center where the job completed
        center: CenterId,
        /// Class the job completed with
        class: JobClass,
    },
    /// Transient sample
    Sample,
}

impl Dispatched {
    /// Whether this event counts towards closing a batch under `trigger`
    pub fn counts_for(self, trigger: BatchTrigger) -> bool {
        match (trigger, self) {
            (BatchTrigger::ExternalArrivals, Dispatched::Arrival) => true,
            (BatchTrigger::Completions(reference), Dispatched::Completion { class, .. }) => class == reference,
            _ => false,
        }
    }
}

/// State of one run: centers, clock and arrival process
#[derive(Debug)]
pub struct SimulationEngine<'a> {
    scenario: &'a Scenario,
    centers: Vec<ServiceCenter>,
    clock: Clock,
    arrivals: ArrivalProcess,
    visit_ratios: Vec<f64>,
    horizon: f64,
    sample_interval: Option<f64>,
    samples: Vec<TransientSample>,
    counters: NetworkCounters,
    origin: f64,
    events: u64,
}

impl<'a> SimulationEngine<'a> {
    /// Fresh run of `scenario` with Poisson arrivals at `arrival_rate`
    pub fn new(scenario: &'a Scenario, arrival_rate: f64) -> SimulationResult<Self> {
        scenario.validate()?;
        let visit_ratios = scenario.visit_ratios()?;
        let centers = scenario
            .centers
            .iter()
            .enumerate()
            .map(|(index, name)| ServiceCenter::new(CenterId(index), name.clone()))
            .collect();

        Ok(Self {
            scenario,
            centers,
            clock: Clock::new(scenario.center_count()),
            arrivals: ArrivalProcess::new(arrival_rate)?,
            visit_ratios,
            horizon: UNSCHEDULED,
            sample_interval: None,
            samples: Vec::new(),
            counters: NetworkCounters::default(),
            origin: 0.0,
            events: 0,
        })
    }

    /// Record running sojourn means every `interval` time units
    pub fn with_sampling(mut self, interval: Option<f64>) -> SimulationResult<Self> {
        if let Some(interval) = interval {
            if !(interval.is_finite() && interval > 0.0) {
                return Err(SimulationError::configuration_error(format!(
                    "sample interval must be positive, got {}",
                    interval
                )));
            }
        }
        self.sample_interval = interval;
        Ok(self)
    }

    /// Centers of the run, in index order
    pub fn centers(&self) -> &[ServiceCenter] {
        &self.centers
    }

    /// Clock of the run
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Network boundary and routing counts so far
    pub fn counters(&self) -> NetworkCounters {
        self.counters
    }

    /// Run to completion under `mode`
    #[instrument(skip(self, rng), fields(scenario = %self.scenario.kind, rate = self.arrivals.rate()))]
    pub fn run<R: RandomSource + ?Sized>(mut self, mode: &RunMode, rng: &mut R) -> SimulationResult<RunResult> {
        let outcome = match *mode {
            RunMode::FiniteHorizon { horizon } => {
                let stats = self.run_finite_horizon(horizon, rng)?;
                RunOutcome::FiniteHorizon(stats)
            }
            RunMode::BatchMeans { batch_length, batch_count, alpha, trigger } => {
                self.scenario.check_batch_trigger(trigger)?;
                let mut estimator = BatchEstimator::new(batch_length, batch_count, alpha)?;
                let summary = self.run_batch_means(&mut estimator, trigger, rng)?;
                RunOutcome::BatchMeans(summary)
            }
        };

        sim_event!(
            info,
            "run completed",
            scenario = tracing::field::display(self.scenario.kind),
            events = self.events,
            external_arrivals = self.counters.external_arrivals,
            exits = self.counters.exits,
        );

        let centers = self
            .centers
            .iter()
            .map(|c| CenterTotals {
                name: c.name().to_string(),
                arrivals: c.lifetime_arrivals(),
                departures: c.lifetime_departures(),
                resident: c.population(),
            })
            .collect();

        Ok(RunResult { outcome, samples: self.samples, counters: self.counters, centers, events: self.events })
    }

    fn run_finite_horizon<R: RandomSource + ?Sized>(&mut self, horizon: f64, rng: &mut R) -> SimulationResult<RunStatistics> {
        if !(horizon.is_finite() && horizon > 0.0) {
            return Err(SimulationError::configuration_error(format!(
                "horizon must be positive, got {}",
                horizon
            )));
        }
        self.start(horizon, rng)?;
        while self.step(rng)?.is_some() {}

        let elapsed = self.clock.current();
        debug!(elapsed, events = self.events, "event set drained");
        RunStatistics::collect(&self.centers, &self.visit_ratios, elapsed)
    }

    fn run_batch_means<R: RandomSource + ?Sized>(
        &mut self,
        estimator: &mut BatchEstimator,
        trigger: BatchTrigger,
        rng: &mut R,
    ) -> SimulationResult<BatchMeansSummary> {
        self.start(UNSCHEDULED, rng)?;
        loop {
            let dispatched = self
                .step(rng)?
                .ok_or_else(|| SimulationError::clock_invariant("event set drained before the last batch"))?;
            if dispatched.counts_for(trigger) && estimator.observe() {
                self.close_batch(estimator)?;
                if estimator.is_complete() {
                    break;
                }
            }
        }
        estimator.summarize()
    }

    fn start<R: RandomSource + ?Sized>(&mut self, horizon: f64, rng: &mut R) -> SimulationResult<()> {
        self.horizon = horizon;
        let first = self.arrivals.next_arrival(rng)?;
        self.clock.set_next_arrival(if first <= horizon { first } else { UNSCHEDULED });
        if let Some(interval) = self.sample_interval {
            self.schedule_sample(interval);
        }
        Ok(())
    }

    // Dispatch the earliest event, `None` once nothing is scheduled
    fn step<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> SimulationResult<Option<Dispatched>> {
        let Some((source, next)) = self.clock.next_event() else {
            return Ok(None);
        };

        for center in &mut self.centers {
            center.advance(next)?;
        }
        self.clock.advance_to(next)?;

        let dispatched = match source {
            EventSource::Arrival => {
                self.handle_arrival(rng)?;
                Dispatched::Arrival
            }
            EventSource::Completion(center) => {
                let class = self.handle_completion(center, rng)?;
                Dispatched::Completion { center, class }
            }
            EventSource::Sample => {
                self.handle_sample();
                Dispatched::Sample
            }
        };
        self.events += 1;
        trace!(event = %source, at = next, "dispatched");
        Ok(Some(dispatched))
    }

    fn handle_arrival<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> SimulationResult<()> {
        let now = self.clock.current();
        self.counters.external_arrivals += 1;
        let (center, class) = self.scenario.routing.entry_hop(rng)?;
        self.admit(center, class, now, rng)?;

        let next = self.arrivals.next_arrival(rng)?;
        self.clock.set_next_arrival(if next <= self.horizon { next } else { UNSCHEDULED });
        Ok(())
    }

    fn handle_completion<R: RandomSource + ?Sized>(&mut self, id: CenterId, rng: &mut R) -> SimulationResult<JobClass> {
        let now = self.clock.current();
        let job = self.center_mut(id)?.complete_next(now)?;
        self.reschedule(id)?;

        match self.scenario.routing.next_hop(id, job.class, rng)? {
            Some((destination, class)) => {
                self.counters.routed += 1;
                self.admit(destination, class, now, rng)?;
            }
            None => self.counters.exits += 1,
        }
        Ok(job.class)
    }

    fn handle_sample(&mut self) {
        let now = self.clock.current();
        self.samples.push(TransientSample::capture(self.origin + now, &self.centers, &self.visit_ratios));
        if let Some(interval) = self.sample_interval {
            self.schedule_sample(now + interval);
        }
    }

    fn schedule_sample(&mut self, at: f64) {
        self.clock.set_next_sample(if at <= self.horizon { at } else { UNSCHEDULED });
    }

    // Sample the service demand of a new job and hand it to its center
    fn admit<R: RandomSource + ?Sized>(
        &mut self,
        center: CenterId,
        class: JobClass,
        now: f64,
        rng: &mut R,
    ) -> SimulationResult<()> {
        let mean = self.scenario.demands.mean(class)?;
        rng.select_stream(class.service_stream());
        let demand = rng.exponential(mean)?;
        self.center_mut(center)?.accept_arrival(Job::new(class, now, demand))?;
        self.reschedule(center)
    }

    fn reschedule(&mut self, id: CenterId) -> SimulationResult<()> {
        let center = self.center_mut(id)?;
        let at = if center.is_empty() {
            UNSCHEDULED
        } else {
            center.next_completion_offset()?
        };
        let at = at + self.clock.current();
        self.clock.set_completion(id, at)
    }

    fn center_mut(&mut self, id: CenterId) -> SimulationResult<&mut ServiceCenter> {
        self.centers
            .get_mut(id.index())
            .ok_or_else(|| SimulationError::invariant(id, "no such center"))
    }

    // Snapshot the window, restart statistics and move the time origin to now
    fn close_batch(&mut self, estimator: &mut BatchEstimator) -> SimulationResult<()> {
        let instant = self.clock.current();
        let stats = RunStatistics::collect(&self.centers, &self.visit_ratios, instant)?;
        estimator.record(&stats)?;
        sim_event!(
            debug,
            "batch closed",
            batch = estimator.batches().len(),
            elapsed = instant,
            response_time = stats.response_time,
            population = stats.network_population,
        );

        for center in &mut self.centers {
            center.reset_statistics();
            center.rebase(instant);
        }
        self.clock.rebase(instant);
        self.arrivals.rebase(instant);
        self.origin += instant;

        // Recompute completions from remaining service so that translation
        // rounding never reaches the tolerance check
        for index in 0..self.centers.len() {
            self.reschedule(CenterId(index))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::TimeIntegrals;
    use crate::random::MultiStreamRng;
    use crate::types::AuthProfile;

    #[test]
    fn test_arrival_process_rejects_bad_rate() {
        assert!(ArrivalProcess::new(0.0).is_err());
        assert!(ArrivalProcess::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_arrival_process_is_increasing() {
        let mut rng = MultiStreamRng::new(3);
        let mut process = ArrivalProcess::new(2.0).unwrap();
        let mut last = 0.0;
        for _ in 0..100 {
            let t = process.next_arrival(&mut rng).unwrap();
            assert!(t > last);
            last = t;
        }
        process.rebase(last);
        assert_eq!(process.last_arrival(), 0.0);
    }

    #[test]
    fn test_dispatched_trigger_matching() {
        let completion = Dispatched::Completion { center: CenterId(0), class: JobClass::A3 };
        assert!(completion.counts_for(BatchTrigger::Completions(JobClass::A3)));
        assert!(!completion.counts_for(BatchTrigger::Completions(JobClass::A1)));
        assert!(!completion.counts_for(BatchTrigger::ExternalArrivals));
        assert!(Dispatched::Arrival.counts_for(BatchTrigger::ExternalArrivals));
        assert!(!Dispatched::Sample.counts_for(BatchTrigger::ExternalArrivals));
    }

    #[test]
    fn test_finite_horizon_drains() {
        let scenario = Scenario::single_server(0.7);
        let engine = SimulationEngine::new(&scenario, 0.5).unwrap();
        let mut rng = MultiStreamRng::new(1);
        let result = engine.run(&RunMode::FiniteHorizon { horizon: 500.0 }, &mut rng).unwrap();

        assert_eq!(result.centers[0].resident, 0);
        assert_eq!(result.counters.external_arrivals, result.counters.exits);
        assert_eq!(result.counters.routed, 0);
        assert!(matches!(result.outcome, RunOutcome::FiniteHorizon(_)));
    }

    #[test]
    fn test_batch_means_collects_batches() {
        let scenario = Scenario::web_app(AuthProfile::Basic, false);
        let engine = SimulationEngine::new(&scenario, 0.5).unwrap();
        let mut rng = MultiStreamRng::new(2);
        let mode = RunMode::BatchMeans {
            batch_length: 64,
            batch_count: 4,
            alpha: 0.05,
            trigger: BatchTrigger::Completions(JobClass::A3),
        };
        let result = engine.run(&mode, &mut rng).unwrap();
        match result.outcome {
            RunOutcome::BatchMeans(summary) => {
                assert_eq!(summary.batch_count, 4);
                assert_eq!(summary.interleaved().len(), 2 * summary.field_names.len());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_sampling_stops_at_horizon() {
        let scenario = Scenario::single_server(0.7);
        let engine = SimulationEngine::new(&scenario, 0.5).unwrap().with_sampling(Some(100.0)).unwrap();
        let mut rng = MultiStreamRng::new(4);
        let result = engine.run(&RunMode::FiniteHorizon { horizon: 1000.0 }, &mut rng).unwrap();
        assert_eq!(result.samples.len(), 10);
        assert_eq!(result.samples[0].time, 100.0);
    }

    #[test]
    fn test_sampling_rejects_bad_interval() {
        let scenario = Scenario::single_server(0.7);
        let engine = SimulationEngine::new(&scenario, 0.5).unwrap();
        assert!(engine.with_sampling(Some(0.0)).is_err());
    }

    #[test]
    fn test_batch_close_preserves_physical_state() {
        let scenario = Scenario::web_app(AuthProfile::Basic, false);
        let mut engine = SimulationEngine::new(&scenario, 0.9).unwrap();
        let mut rng = MultiStreamRng::new(31);
        let mut estimator = BatchEstimator::new(40, 2, 0.05).unwrap();
        let trigger = BatchTrigger::Completions(JobClass::A3);

        engine.start(UNSCHEDULED, &mut rng).unwrap();
        loop {
            let dispatched = engine.step(&mut rng).unwrap().unwrap();
            if dispatched.counts_for(trigger) && estimator.observe() {
                break;
            }
        }

        let instant = engine.clock.current();
        assert!(instant > 0.0);
        let next_arrival = engine.clock.next_arrival();
        let residents: Vec<Vec<(JobClass, f64)>> = engine
            .centers
            .iter()
            .map(|c| c.jobs().iter().map(|j| (j.class, j.remaining_service)).collect())
            .collect();
        let lifetime: Vec<(u64, u64)> = engine
            .centers
            .iter()
            .map(|c| (c.lifetime_arrivals(), c.lifetime_departures()))
            .collect();

        engine.close_batch(&mut estimator).unwrap();

        assert_eq!(estimator.batches().len(), 1);
        assert_eq!(estimator.counter(), 0);
        assert_eq!(engine.clock.current(), 0.0);
        assert_eq!(engine.origin, instant);
        assert!((engine.clock.next_arrival() - (next_arrival - instant)).abs() < 1e-9);
        assert!((engine.arrivals.last_arrival() - (next_arrival - instant)).abs() < 1e-9);

        for (index, center) in engine.centers.iter().enumerate() {
            let after: Vec<(JobClass, f64)> = center.jobs().iter().map(|j| (j.class, j.remaining_service)).collect();
            assert_eq!(after, residents[index], "residents changed at {}", center.name());
            assert_eq!((center.lifetime_arrivals(), center.lifetime_departures()), lifetime[index]);
            assert_eq!(center.departed_count(), 0);
            assert_eq!(center.last_event_time(), 0.0);
            assert_eq!(center.integrals(), TimeIntegrals::default());
            assert!(center.jobs().iter().all(|j| j.arrival_time == 0.0));

            let scheduled = engine.clock.completion(CenterId(index));
            let least = center.jobs().iter().map(|j| j.remaining_service).fold(f64::INFINITY, f64::min);
            if center.is_empty() {
                assert_eq!(scheduled, UNSCHEDULED);
            } else {
                assert_eq!(scheduled, least * center.population() as f64);
            }
        }

        // The rebased run keeps going without tripping any invariant
        for _ in 0..500 {
            engine.step(&mut rng).unwrap().unwrap();
        }
    }

    #[test]
    fn test_unreachable_trigger_rejected_before_loop() {
        let scenario = Scenario::single_server(0.7);
        let engine = SimulationEngine::new(&scenario, 0.5).unwrap();
        let mut rng = MultiStreamRng::new(9);
        let mode = RunMode::BatchMeans {
            batch_length: 10,
            batch_count: 2,
            alpha: 0.05,
            trigger: BatchTrigger::Completions(JobClass::B),
        };
        assert!(matches!(
            engine.run(&mode, &mut rng),
            Err(SimulationError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_mode_from_config_checks_trigger() {
        let scenario = Scenario::single_server(0.7);
        let config = SimulationConfig {
            batch_trigger: Some(BatchTrigger::Completions(JobClass::B)),
            ..Default::default()
        };
        assert!(RunMode::from_config(&config, &scenario).is_err());

        let config = SimulationConfig { batch_trigger: None, ..Default::default() };
        match RunMode::from_config(&config, &scenario).unwrap() {
            RunMode::BatchMeans { trigger, .. } => assert_eq!(trigger, BatchTrigger::Completions(JobClass::A1)),
            other => panic!("unexpected mode {:?}", other),
        }
    }
}
