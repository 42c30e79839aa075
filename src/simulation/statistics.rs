//! Statistics collection and reporting
//!
//! A [`RunStatistics`] is the output record of one observation window:
//! per-center snapshots followed by the network-wide response time and
//! population. It is produced at the end of a finite-horizon run and at
//! every batch boundary.

use crate::network::ServiceCenter;
use crate::simulation::SimulationResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the per-center output fields, in record order
pub const CENTER_FIELDS: [&str; 5] = ["interarrival", "sojourn", "population", "utilization", "departed"];

/// Name of the network mean response time field
pub const RESPONSE_TIME_FIELD: &str = "network_response_time";

/// Name of the network mean population field
pub const POPULATION_FIELD: &str = "network_population";

/// Statistics of one center over an observation window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CenterSnapshot {
    /// Center name
    pub name: String,
    /// Mean gap between consecutive arrivals
    pub mean_interarrival: f64,
    /// Mean time from arrival to completion
    pub mean_sojourn: f64,
    /// Time-averaged number of resident jobs
    pub mean_population: f64,
    /// Fraction of time with at least one resident job
    pub utilization: f64,
    /// Jobs completed in the window
    pub departed: u64,
    /// Standard deviation of the inter-arrival gaps
    pub interarrival_std_dev: f64,
    /// Standard deviation of the sojourn times
    pub sojourn_std_dev: f64,
}

impl CenterSnapshot {
    /// Output fields in [`CENTER_FIELDS`] order
    pub fn values(&self) -> [f64; 5] {
        [
            self.mean_interarrival,
            self.mean_sojourn,
            self.mean_population,
            self.utilization,
            self.departed as f64,
        ]
    }

    /// Departures per unit time over a window of length `elapsed`
    pub fn throughput(&self, elapsed: f64) -> f64 {
        if elapsed > 0.0 {
            self.departed as f64 / elapsed
        } else {
            0.0
        }
    }
}

/// Output record of one observation window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Length of the observation window
    pub elapsed: f64,
    /// One snapshot per center, in center order
    pub centers: Vec<CenterSnapshot>,
    /// Visit-weighted sum of the center sojourn times
    pub response_time: f64,
    /// Sum of the center populations
    pub network_population: f64,
}

impl RunStatistics {
    /// Snapshot every center over a window of length `elapsed`
    ///
    /// `visit_ratios[c]` is the expected number of visits an external
    /// arrival pays to center `c`.
    pub fn collect(centers: &[ServiceCenter], visit_ratios: &[f64], elapsed: f64) -> SimulationResult<Self> {
        let snapshots = centers
            .iter()
            .map(|center| center.snapshot(elapsed))
            .collect::<SimulationResult<Vec<_>>>()?;

        let response_time = snapshots
            .iter()
            .zip(visit_ratios)
            .map(|(snapshot, ratio)| ratio * snapshot.mean_sojourn)
            .sum();
        let network_population = snapshots.iter().map(|s| s.mean_population).sum();

        Ok(Self { elapsed, centers: snapshots, response_time, network_population })
    }

    /// Every output field, in record order
    pub fn values(&self) -> Vec<f64> {
        let mut values: Vec<f64> = self.centers.iter().flat_map(|c| c.values()).collect();
        values.push(self.response_time);
        values.push(self.network_population);
        values
    }

    /// Field names matching [`values`](Self::values)
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .centers
            .iter()
            .flat_map(|c| CENTER_FIELDS.iter().map(move |field| format!("{}_{}", c.name, field)))
            .collect();
        names.push(RESPONSE_TIME_FIELD.to_string());
        names.push(POPULATION_FIELD.to_string());
        names
    }

    /// Snapshot of the center called `name`
    pub fn center(&self, name: &str) -> Option<&CenterSnapshot> {
        self.centers.iter().find(|c| c.name == name)
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "elapsed {:.1}, response time {:.4}, population {:.4}",
            self.elapsed, self.response_time, self.network_population
        )
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for c in &self.centers {
            writeln!(
                f,
                "  {:<6} rho {:.4}  L {:.4}  W {:.4}  gap {:.4}  departed {}",
                c.name, c.utilization, c.mean_population, c.mean_sojourn, c.mean_interarrival, c.departed
            )?;
        }
        Ok(())
    }
}

/// Running estimates captured at one instant of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransientSample {
    /// Simulated time of the sample
    pub time: f64,
    /// Running mean sojourn of every center, in center order
    pub mean_sojourn: Vec<f64>,
    /// Visit-weighted sum of the running mean sojourns
    pub response_time: f64,
}

impl TransientSample {
    /// Read the running sojourn means without disturbing any accumulator
    pub fn capture(time: f64, centers: &[ServiceCenter], visit_ratios: &[f64]) -> Self {
        let mean_sojourn: Vec<f64> = centers.iter().map(|c| c.sojourn_stats().mean()).collect();
        let response_time = mean_sojourn.iter().zip(visit_ratios).map(|(w, v)| w * v).sum();
        Self { time, mean_sojourn, response_time }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Job;
    use crate::types::{CenterId, JobClass};

    fn finished_center(id: usize, name: &str, demand: f64) -> ServiceCenter {
        let mut center = ServiceCenter::new(CenterId(id), name);
        center.accept_arrival(Job::new(JobClass::A1, 0.0, demand)).unwrap();
        center.complete_next(demand).unwrap();
        center
    }

    #[test]
    fn test_collect_network_totals() {
        let centers = vec![finished_center(0, "A", 1.0), finished_center(1, "B", 2.0)];
        let stats = RunStatistics::collect(&centers, &[3.0, 1.0], 4.0).unwrap();

        assert_eq!(stats.centers.len(), 2);
        assert!((stats.response_time - 5.0).abs() < 1e-12);
        assert!((stats.network_population - 0.75).abs() < 1e-12);
        assert_eq!(stats.center("B").unwrap().departed, 1);
    }

    #[test]
    fn test_values_and_names_align() {
        let centers = vec![finished_center(0, "A", 1.0)];
        let stats = RunStatistics::collect(&centers, &[1.0], 2.0).unwrap();
        let names = stats.field_names();
        let values = stats.values();

        assert_eq!(names.len(), values.len());
        assert_eq!(names[0], "A_interarrival");
        assert_eq!(names[3], "A_utilization");
        assert!((values[3] - 0.5).abs() < 1e-12);
        assert_eq!(names.last().unwrap(), POPULATION_FIELD);
    }

    #[test]
    fn test_collect_propagates_degenerate_center() {
        let idle = ServiceCenter::new(CenterId(0), "A");
        assert!(RunStatistics::collect(&[idle], &[1.0], 10.0).is_err());
    }

    #[test]
    fn test_transient_sample_capture() {
        let centers = vec![finished_center(0, "A", 0.5)];
        let sample = TransientSample::capture(7.0, &centers, &[2.0]);
        assert_eq!(sample.time, 7.0);
        assert_eq!(sample.mean_sojourn, vec![0.5]);
        assert!((sample.response_time - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_throughput() {
        let centers = vec![finished_center(0, "A", 1.0)];
        let stats = RunStatistics::collect(&centers, &[1.0], 4.0).unwrap();
        assert!((stats.centers[0].throughput(4.0) - 0.25).abs() < 1e-12);
        assert!(stats.to_string().contains("departed 1"));
    }
}
