//! Simulation clock and event selection
//!
//! The clock keeps one scheduled time per event source: the next external
//! arrival, the next completion of every center and the optional transient
//! sample. Selection returns the source together with its time, so handlers
//! are dispatched by identity rather than by comparing floats.

use crate::simulation::{SimulationError, SimulationResult};
use crate::types::CenterId;
use std::fmt;

/// Scheduled time of a source with nothing pending
pub const UNSCHEDULED: f64 = f64::INFINITY;

/// Origin of a scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSource {
    /// Next external arrival into the network
    Arrival,
    /// Next completion at a center
    Completion(CenterId),
    /// Next transient sample of the running statistics
    Sample,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSource::Arrival => write!(f, "arrival"),
            EventSource::Completion(center) => write!(f, "completion@{}", center),
            EventSource::Sample => write!(f, "sample"),
        }
    }
}

/// Current time plus the pending time of every event source
#[derive(Debug, Clone)]
pub struct Clock {
    current: f64,
    next_arrival: f64,
    completions: Vec<f64>,
    next_sample: f64,
}

impl Clock {
    /// Clock at time zero with nothing scheduled
    pub fn new(center_count: usize) -> Self {
        Self {
            current: 0.0,
            next_arrival: UNSCHEDULED,
            completions: vec![UNSCHEDULED; center_count],
            next_sample: UNSCHEDULED,
        }
    }

    /// Current simulated time
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Pending external arrival time
    pub fn next_arrival(&self) -> f64 {
        self.next_arrival
    }

    /// Schedule (or with [`UNSCHEDULED`], cancel) the next external arrival
    pub fn set_next_arrival(&mut self, time: f64) {
        self.next_arrival = time;
    }

    /// Pending completion time of `center`
    pub fn completion(&self, center: CenterId) -> f64 {
        self.completions.get(center.index()).copied().unwrap_or(UNSCHEDULED)
    }

    /// Schedule (or with [`UNSCHEDULED`], cancel) the next completion of `center`
    pub fn set_completion(&mut self, center: CenterId, time: f64) -> SimulationResult<()> {
        let slot = self.completions.get_mut(center.index()).ok_or_else(|| {
            SimulationError::clock_invariant(format!("no completion slot for {}", center))
        })?;
        *slot = time;
        Ok(())
    }

    /// Pending transient sample time
    pub fn next_sample(&self) -> f64 {
        self.next_sample
    }

    /// Schedule (or with [`UNSCHEDULED`], cancel) the next transient sample
    pub fn set_next_sample(&mut self, time: f64) {
        self.next_sample = time;
    }

    /// Earliest scheduled event, `None` when every source is unscheduled
    ///
    /// Ties go to the arrival, then to completions by ascending center
    /// index, then to the sample.
    pub fn next_event(&self) -> Option<(EventSource, f64)> {
        let mut best = (EventSource::Arrival, self.next_arrival);
        for (index, &time) in self.completions.iter().enumerate() {
            if time < best.1 {
                best = (EventSource::Completion(CenterId(index)), time);
            }
        }
        if self.next_sample < best.1 {
            best = (EventSource::Sample, self.next_sample);
        }

        if best.1 == UNSCHEDULED {
            None
        } else {
            Some(best)
        }
    }

    /// Move the current time forward to `time`
    pub fn advance_to(&mut self, time: f64) -> SimulationResult<()> {
        if time < self.current {
            return Err(SimulationError::clock_invariant(format!(
                "selected event at {} precedes current time {}",
                time, self.current
            )));
        }
        self.current = time;
        Ok(())
    }

    /// Translate the current time and every scheduled time by `-instant`
    pub fn rebase(&mut self, instant: f64) {
        self.current -= instant;
        self.next_arrival -= instant;
        self.next_sample -= instant;
        for time in &mut self.completions {
            *time -= instant;
        }
    }
}
