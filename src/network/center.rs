//! Processor-sharing service center
//!
//! Every resident job receives `1/population` of the center's capacity at
//! every instant. Elapsed time since the last center-affecting event is
//! therefore apportioned to all resident jobs before any mutation, and
//! [`ServiceCenter::advance`] must run exactly once per interval: skipping it
//! or applying it twice corrupts every downstream statistic.

use super::Job;
use crate::simulation::{CenterSnapshot, SimulationError, SimulationResult};
use crate::types::CenterId;
use tracing::trace;

/// Rounding slack, in units of `f64::EPSILON` relative to the current time
pub const TIME_TOLERANCE_ULPS: f64 = 1024.0;

/// Largest negative remaining service still treated as exactly zero at `now`
pub fn time_tolerance(now: f64) -> f64 {
    f64::EPSILON * TIME_TOLERANCE_ULPS * now.abs().max(1.0)
}

/// Welford running mean and variance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnlineStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl OnlineStats {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation into the running moments
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let n = self.count as f64;
        let d = value - self.mean;
        self.m2 += d * d * (n - 1.0) / n;
        self.mean += d / n;
    }

    /// Number of observations
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Running mean, 0 before the first observation
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance of the observations
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// Population standard deviation of the observations
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Forget every observation
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Riemann-sum accumulators of a center's state over time
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeIntegrals {
    /// Area under the population curve
    pub population: f64,
    /// Time spent with at least one resident job
    pub busy: f64,
}

/// A processor-sharing queue owning its resident jobs
#[derive(Debug, Clone)]
pub struct ServiceCenter {
    id: CenterId,
    name: String,
    jobs: Vec<Job>,
    departed: u64,
    lifetime_arrivals: u64,
    lifetime_departures: u64,
    last_event_time: f64,
    last_arrival_time: f64,
    integrals: TimeIntegrals,
    interarrival: OnlineStats,
    sojourn: OnlineStats,
}

impl ServiceCenter {
    /// Create an empty center with its clock at zero
    pub fn new(id: CenterId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            jobs: Vec::new(),
            departed: 0,
            lifetime_arrivals: 0,
            lifetime_departures: 0,
            last_event_time: 0.0,
            last_arrival_time: 0.0,
            integrals: TimeIntegrals::default(),
            interarrival: OnlineStats::new(),
            sojourn: OnlineStats::new(),
        }
    }

    /// Bring every resident job and the time integrals up to `now`
    pub fn advance(&mut self, now: f64) -> SimulationResult<()> {
        let tolerance = time_tolerance(now);
        let delta = now - self.last_event_time;
        if delta < -tolerance {
            return Err(SimulationError::invariant(
                self.id,
                format!("advance to {} precedes last event at {}", now, self.last_event_time),
            ));
        }
        let delta = delta.max(0.0);

        let population = self.jobs.len();
        if population > 0 {
            let share = delta / population as f64;
            for job in &mut self.jobs {
                job.remaining_service -= share;
                if job.remaining_service < 0.0 {
                    if job.remaining_service < -tolerance {
                        return Err(SimulationError::invariant(
                            self.id,
                            format!(
                                "{} job overran its service by {} at {}",
                                job.class, -job.remaining_service, now
                            ),
                        ));
                    }
                    job.remaining_service = 0.0;
                }
                job.last_update_time = now;
            }
            self.integrals.population += delta * population as f64;
            self.integrals.busy += delta;
        }

        self.last_event_time = now;
        Ok(())
    }

    /// Admit a job at its arrival time
    pub fn accept_arrival(&mut self, job: Job) -> SimulationResult<()> {
        if !(job.remaining_service.is_finite() && job.remaining_service >= 0.0) {
            return Err(SimulationError::invariant(
                self.id,
                format!("{} job arrived with service demand {}", job.class, job.remaining_service),
            ));
        }
        self.advance(job.arrival_time)?;

        self.interarrival.update(job.arrival_time - self.last_arrival_time);
        self.last_arrival_time = job.arrival_time;

        trace!(center = %self.name, class = %job.class, at = job.arrival_time, "arrival");
        self.jobs.push(job);
        self.lifetime_arrivals += 1;
        Ok(())
    }

    /// Remove the job that finishes at `now`, the already-scheduled completion time
    pub fn complete_next(&mut self, now: f64) -> SimulationResult<Job> {
        self.advance(now)?;

        let (index, remaining) = self
            .min_remaining()
            .ok_or_else(|| SimulationError::invariant(self.id, "completion scheduled on an empty center"))?;
        if remaining > time_tolerance(now) {
            return Err(SimulationError::invariant(
                self.id,
                format!("no job finished at {} (least remaining service {})", now, remaining),
            ));
        }

        let mut job = self.jobs.remove(index);
        job.remaining_service = 0.0;
        self.departed += 1;
        self.lifetime_departures += 1;
        self.sojourn.update(now - job.arrival_time);

        trace!(center = %self.name, class = %job.class, at = now, "completion");
        Ok(job)
    }

    /// Delay until the next completion if nothing else arrives
    pub fn next_completion_offset(&self) -> SimulationResult<f64> {
        let (_, remaining) = self.min_remaining().ok_or_else(|| {
            SimulationError::invariant(self.id, "next completion requested on an empty center")
        })?;
        Ok(remaining * self.jobs.len() as f64)
    }

    // First job holding the least remaining service
    fn min_remaining(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (index, job) in self.jobs.iter().enumerate() {
            match best {
                Some((_, least)) if job.remaining_service >= least => {}
                _ => best = Some((index, job.remaining_service)),
            }
        }
        best
    }

    /// Zero the observation window: integrals, running moments and departures
    pub fn reset_statistics(&mut self) {
        self.integrals = TimeIntegrals::default();
        self.interarrival.reset();
        self.sojourn.reset();
        self.departed = 0;
    }

    /// Translate the center's clock by `-instant`
    ///
    /// Resident jobs keep their remaining service; their arrival time becomes
    /// the new origin.
    pub fn rebase(&mut self, instant: f64) {
        self.last_event_time -= instant;
        self.last_arrival_time = 0.0;
        for job in &mut self.jobs {
            job.arrival_time = 0.0;
            job.last_update_time -= instant;
        }
    }

    /// Summarize the current observation window of length `elapsed`
    pub fn snapshot(&self, elapsed: f64) -> SimulationResult<CenterSnapshot> {
        if !(elapsed > 0.0) {
            return Err(SimulationError::degenerate(
                self.name.clone(),
                format!("observation window has length {}", elapsed),
            ));
        }
        if self.departed == 0 {
            return Err(SimulationError::degenerate(
                self.name.clone(),
                "no departures in the observation window",
            ));
        }

        Ok(CenterSnapshot {
            name: self.name.clone(),
            mean_interarrival: self.interarrival.mean(),
            mean_sojourn: self.sojourn.mean(),
            mean_population: self.integrals.population / elapsed,
            utilization: self.integrals.busy / elapsed,
            departed: self.departed,
            interarrival_std_dev: self.interarrival.std_dev(),
            sojourn_std_dev: self.sojourn.std_dev(),
        })
    }

    /// Identifier of the center
    pub fn id(&self) -> CenterId {
        self.id
    }

    /// Display name of the center
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of resident jobs
    pub fn population(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no job is resident
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Resident jobs, in arrival order
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Departures in the current observation window
    pub fn departed_count(&self) -> u64 {
        self.departed
    }

    /// Arrivals since the center was created
    pub fn lifetime_arrivals(&self) -> u64 {
        self.lifetime_arrivals
    }

    /// Departures since the center was created
    pub fn lifetime_departures(&self) -> u64 {
        self.lifetime_departures
    }

    /// Time of the last population-affecting event
    pub fn last_event_time(&self) -> f64 {
        self.last_event_time
    }

    /// Time integrals of the current observation window
    pub fn integrals(&self) -> TimeIntegrals {
        self.integrals
    }

    /// Inter-arrival accumulator of the current observation window
    pub fn interarrival_stats(&self) -> &OnlineStats {
        &self.interarrival
    }

    /// Sojourn-time accumulator of the current observation window
    pub fn sojourn_stats(&self) -> &OnlineStats {
        &self.sojourn
    }
}
