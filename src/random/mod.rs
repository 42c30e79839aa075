//! Random number streams and variate generation
//!
//! - **RandomSource**: reproducible multi-stream uniform generator
//! - **VariateGenerator**: exponential, Bernoulli and equilikely variates
//!
//! # Usage Example
//!
//! ```rust
//! use ps_network_simulator::random::*;
//! use ps_network_simulator::types::StreamId;
//!
//! let mut rng = MultiStreamRng::new(123_456_789);
//! rng.select_stream(StreamId::ARRIVALS);
//! let gap = rng.exponential(2.0).unwrap();
//! assert!(gap > 0.0);
//! ```

pub mod streams;
pub mod variates;

pub use streams::*;
pub use variates::*;
