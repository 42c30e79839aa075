//! Jobs in flight
//!
//! A job carries its class and the service it still owes; the center that
//! holds it brings `remaining_service` up to date on every event.
//!
//! ```rust
//! use ps_network_simulator::network::Job;
//! use ps_network_simulator::types::JobClass;
//!
//! let job = Job::new(JobClass::B, 4.0, 0.8);
//! assert_eq!(job.remaining_service, 0.8);
//! assert_eq!(job.last_update_time, job.arrival_time);
//! ```

use crate::types::JobClass;

/// A request in flight, owned by exactly one service center
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Position of the request in its path through the network
    pub class: JobClass,
    /// Time the job entered its current center
    pub arrival_time: f64,
    /// Service still owed to the job at full capacity
    pub remaining_service: f64,
    /// Last time the remaining service was brought up to date
    pub last_update_time: f64,
}

impl Job {
    /// Create a job owing its full service demand
    pub fn new(class: JobClass, arrival_time: f64, service_demand: f64) -> Self {
        Self {
            class,
            arrival_time,
            remaining_service: service_demand,
            last_update_time: arrival_time,
        }
    }
}
