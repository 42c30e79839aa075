//! Network model: jobs, processor-sharing centers, clock and routing
//!
//! # Overview
//!
//! - **Job**: a request in flight with its remaining service
//! - **ServiceCenter**: processor-sharing queue with time integrals
//! - **Clock**: one scheduled time per event source, dispatch by identity
//! - **RoutingTable**: `(center, class)` to next hop or exit
//! - **Scenario**: center list, service demands and routing of one network
//!
//! # Usage Example
//!
//! ```rust
//! use ps_network_simulator::network::*;
//! use ps_network_simulator::types::{CenterId, JobClass};
//!
//! let mut center = ServiceCenter::new(CenterId(0), "A");
//! center.accept_arrival(Job::new(JobClass::A1, 0.0, 1.0)).unwrap();
//! center.accept_arrival(Job::new(JobClass::A1, 0.0, 2.0)).unwrap();
//!
//! // Two jobs share the server: the shorter one needs twice its demand
//! assert_eq!(center.next_completion_offset().unwrap(), 2.0);
//! ```

pub mod center;
pub mod clock;
pub mod job;
pub mod router;
pub mod scenario;

pub use center::*;
pub use clock::*;
pub use job::*;
pub use router::*;
pub use scenario::*;
