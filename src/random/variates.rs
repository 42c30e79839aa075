//! Random variate generation on top of a [`RandomSource`]
//!
//! The simulation only needs three distributions: exponential inter-arrival
//! and service times, Bernoulli routing coins and an equilikely replica pick.

use super::RandomSource;
use crate::simulation::{SimulationError, SimulationResult};
use rand::distributions::{Bernoulli, Distribution, Uniform};
use rand_distr::Exp;

/// Maps uniform draws of the selected stream to variates
pub trait VariateGenerator {
    /// Exponential variate with the given mean; `mean` must be positive
    fn exponential(&mut self, mean: f64) -> SimulationResult<f64>;

    /// `true` with probability `p`
    fn bernoulli(&mut self, p: f64) -> SimulationResult<bool>;

    /// Integer uniformly distributed over `a..=b`
    fn equilikely(&mut self, a: usize, b: usize) -> SimulationResult<usize>;
}

impl<R: RandomSource + ?Sized> VariateGenerator for R {
    fn exponential(&mut self, mean: f64) -> SimulationResult<f64> {
        if !(mean.is_finite() && mean > 0.0) {
            return Err(SimulationError::invalid_variate(format!(
                "exponential mean must be positive, got {}",
                mean
            )));
        }
        let dist = Exp::new(1.0 / mean)
            .map_err(|e| SimulationError::invalid_variate(format!("exponential({}): {}", mean, e)))?;
        Ok(dist.sample(self))
    }

    fn bernoulli(&mut self, p: f64) -> SimulationResult<bool> {
        let dist = Bernoulli::new(p)
            .map_err(|e| SimulationError::invalid_variate(format!("bernoulli({}): {}", p, e)))?;
        Ok(dist.sample(self))
    }

    fn equilikely(&mut self, a: usize, b: usize) -> SimulationResult<usize> {
        if a > b {
            return Err(SimulationError::invalid_variate(format!(
                "equilikely bounds out of order: {} > {}",
                a, b
            )));
        }
        Ok(Uniform::new_inclusive(a, b).sample(self))
    }
}
