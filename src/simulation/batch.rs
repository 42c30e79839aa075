//! Batch-means estimation
//!
//! One long run is cut into `k` consecutive batches of `b` reference events.
//! Each batch contributes one output record; the records are treated as
//! approximately independent observations of the steady state and turned
//! into grand means with Student-t confidence half-widths.
//!
//! The estimator only counts and stores: closing a batch (snapshotting the
//! centers, zeroing their accumulators and rebasing time) is driven by the
//! engine, which owns the physical state.

use super::student_t::two_sided_critical_value;
use super::{RunStatistics, SimulationError, SimulationResult};
use serde::{Deserialize, Serialize};

/// Grand mean of one metric and its confidence half-width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Mean over all batches
    pub mean: f64,
    /// Half-width of the two-sided confidence interval
    pub half_width: f64,
}

/// Grand mean and half-width of `values` at confidence `1 - alpha`
///
/// `half_width = t_{n-1, 1-alpha/2} * s / sqrt(n)` with `s` the sample
/// standard deviation (divisor `n - 1`).
pub fn estimate_interval(values: &[f64], alpha: f64) -> SimulationResult<Estimate> {
    let n = values.len();
    if n < 2 {
        return Err(SimulationError::degenerate(
            "batch-means",
            format!("confidence interval needs at least 2 observations, got {}", n),
        ));
    }

    let mut mean = 0.0;
    let mut sum_squares = 0.0;
    for (i, &x) in values.iter().enumerate() {
        let count = (i + 1) as f64;
        let d = x - mean;
        sum_squares += d * d * (count - 1.0) / count;
        mean += d / count;
    }

    let critical = two_sided_critical_value(n - 1, alpha)?;
    let std_dev = (sum_squares / (n - 1) as f64).sqrt();
    Ok(Estimate { mean, half_width: critical * std_dev / (n as f64).sqrt() })
}

/// Counts reference events and accumulates one record per closed batch
#[derive(Debug, Clone)]
pub struct BatchEstimator {
    batch_length: usize,
    batch_count: usize,
    alpha: f64,
    counter: usize,
    field_names: Vec<String>,
    batches: Vec<Vec<f64>>,
}

impl BatchEstimator {
    /// Estimator closing a batch every `batch_length` events, `batch_count` batches in all
    pub fn new(batch_length: usize, batch_count: usize, alpha: f64) -> SimulationResult<Self> {
        if batch_length == 0 {
            return Err(SimulationError::configuration_error("batch length must be positive"));
        }
        if batch_count < 2 {
            return Err(SimulationError::configuration_error(format!(
                "batch count must be at least 2, got {}",
                batch_count
            )));
        }
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(SimulationError::configuration_error(format!("alpha {} outside (0, 1)", alpha)));
        }
        Ok(Self {
            batch_length,
            batch_count,
            alpha,
            counter: 0,
            field_names: Vec::new(),
            batches: Vec::with_capacity(batch_count),
        })
    }

    /// Count one reference event; `true` when the current batch is full
    pub fn observe(&mut self) -> bool {
        self.counter += 1;
        self.counter >= self.batch_length
    }

    /// Store the record of the batch just closed and restart the count
    pub fn record(&mut self, stats: &RunStatistics) -> SimulationResult<()> {
        let names = stats.field_names();
        if self.batches.is_empty() {
            self.field_names = names;
        } else if names != self.field_names {
            return Err(SimulationError::configuration_error(
                "batch record fields changed between batches",
            ));
        }
        self.batches.push(stats.values());
        self.counter = 0;
        Ok(())
    }

    /// Whether every batch has been collected
    pub fn is_complete(&self) -> bool {
        self.batches.len() >= self.batch_count
    }

    /// Reference events counted in the open batch
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Records of the closed batches
    pub fn batches(&self) -> &[Vec<f64>] {
        &self.batches
    }

    /// Configured batch length
    pub fn batch_length(&self) -> usize {
        self.batch_length
    }

    /// Configured number of batches
    pub fn batch_count(&self) -> usize {
        self.batch_count
    }

    /// Grand means and half-widths over the collected batches
    pub fn summarize(&self) -> SimulationResult<BatchMeansSummary> {
        if !self.is_complete() {
            return Err(SimulationError::degenerate(
                "batch-means",
                format!("only {} of {} batches collected", self.batches.len(), self.batch_count),
            ));
        }

        let estimates = (0..self.field_names.len())
            .map(|field| {
                let column: Vec<f64> = self.batches.iter().map(|batch| batch[field]).collect();
                estimate_interval(&column, self.alpha)
            })
            .collect::<SimulationResult<Vec<_>>>()?;

        Ok(BatchMeansSummary {
            field_names: self.field_names.clone(),
            estimates,
            batch_count: self.batches.len(),
            batch_length: self.batch_length,
            alpha: self.alpha,
        })
    }
}

/// Result of a batch-means run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMeansSummary {
    /// Metric names, in record order
    pub field_names: Vec<String>,
    /// One estimate per metric
    pub estimates: Vec<Estimate>,
    /// Number of batches the estimates are based on
    pub batch_count: usize,
    /// Reference events per batch
    pub batch_length: usize,
    /// Significance level of the intervals
    pub alpha: f64,
}

impl BatchMeansSummary {
    /// `(mean, half_width)` of every metric, flattened in record order
    pub fn interleaved(&self) -> Vec<f64> {
        self.estimates.iter().flat_map(|e| [e.mean, e.half_width]).collect()
    }

    /// Estimate of the metric called `name`
    pub fn estimate(&self, name: &str) -> Option<&Estimate> {
        self.field_names.iter().position(|n| n == name).map(|i| &self.estimates[i])
    }
}
