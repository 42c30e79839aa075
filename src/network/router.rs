//! Completion routing
//!
//! A routing table maps a completing job's `(center, class)` to either the
//! exit or a [`Transition`]: a destination and the class the job takes on
//! there. Destinations are a fixed center or a balanced group of replicas
//! chosen independently per routing decision.
//!
//! # Usage Example
//!
//! ```rust
//! use ps_network_simulator::network::*;
//! use ps_network_simulator::types::{CenterId, JobClass};
//!
//! let a = CenterId(0);
//! let b = CenterId(1);
//! let table = RoutingTable::new(Transition::to(a, JobClass::A1))
//!     .with_rule(a, JobClass::A1, Route::to(b, JobClass::B))
//!     .with_rule(b, JobClass::B, Route::to(a, JobClass::A2))
//!     .with_rule(a, JobClass::A2, Route::Exit);
//!
//! assert!(table.validate(2).is_ok());
//! assert_eq!(table.visit_ratios(2).unwrap(), vec![2.0, 1.0]);
//! ```

use crate::random::{RandomSource, VariateGenerator};
use crate::simulation::{SimulationError, SimulationResult};
use crate::types::{CenterId, JobClass, StreamId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// How a balanced destination picks a replica
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BalancePolicy {
    /// Equilikely over every replica
    Uniform,
    /// First of two replicas with probability `p`, otherwise the second
    Coin {
        /// Probability of the first replica
        p: f64,
    },
}

/// Where a routed job goes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Destination {
    /// A single fixed center
    Center(CenterId),
    /// One of several homogeneous replicas
    Balanced {
        /// Candidate centers
        replicas: Vec<CenterId>,
        /// Choice rule
        policy: BalancePolicy,
    },
}

impl Destination {
    /// Pick the concrete center, drawing from the routing stream if balanced
    pub fn resolve<R: RandomSource + ?Sized>(&self, rng: &mut R) -> SimulationResult<CenterId> {
        match self {
            Destination::Center(center) => Ok(*center),
            Destination::Balanced { replicas, policy } => {
                if replicas.is_empty() {
                    return Err(SimulationError::routing_error("balanced destination without replicas"));
                }
                rng.select_stream(StreamId::ROUTING);
                match policy {
                    BalancePolicy::Uniform => {
                        let pick = rng.equilikely(0, replicas.len() - 1)?;
                        Ok(replicas[pick])
                    }
                    BalancePolicy::Coin { p } => match replicas.as_slice() {
                        [first, second] => Ok(if rng.bernoulli(*p)? { *first } else { *second }),
                        _ => Err(SimulationError::routing_error(format!(
                            "coin balancing needs exactly 2 replicas, got {}",
                            replicas.len()
                        ))),
                    },
                }
            }
        }
    }

    /// Every center this destination may resolve to, with its probability
    pub fn candidates(&self) -> Vec<(CenterId, f64)> {
        match self {
            Destination::Center(center) => vec![(*center, 1.0)],
            Destination::Balanced { replicas, policy: BalancePolicy::Uniform } => {
                let share = 1.0 / replicas.len() as f64;
                replicas.iter().map(|&c| (c, share)).collect()
            }
            Destination::Balanced { replicas, policy: BalancePolicy::Coin { p } } => replicas
                .iter()
                .enumerate()
                .map(|(i, &c)| (c, if i == 0 { *p } else { 1.0 - *p }))
                .collect(),
        }
    }
}

/// Destination plus the class the job takes on there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Where the job goes
    pub destination: Destination,
    /// Class of the job at its destination
    pub class: JobClass,
}

impl Transition {
    /// Transition to a single fixed center
    pub fn to(center: CenterId, class: JobClass) -> Self {
        Self { destination: Destination::Center(center), class }
    }

    /// Transition to a balanced replica group
    pub fn balanced(replicas: Vec<CenterId>, policy: BalancePolicy, class: JobClass) -> Self {
        Self { destination: Destination::Balanced { replicas, policy }, class }
    }
}

/// Outcome of a completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Route {
    /// The job leaves the network
    Exit,
    /// The job moves on
    To(Transition),
}

impl Route {
    /// Route to a single fixed center
    pub fn to(center: CenterId, class: JobClass) -> Self {
        Route::To(Transition::to(center, class))
    }

    /// Route to a balanced replica group
    pub fn balanced(replicas: Vec<CenterId>, policy: BalancePolicy, class: JobClass) -> Self {
        Route::To(Transition::balanced(replicas, policy, class))
    }
}

/// Fixed routing configuration of a scenario
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingTable {
    entry: Transition,
    rules: BTreeMap<(CenterId, JobClass), Route>,
}

impl RoutingTable {
    /// Table whose external arrivals follow `entry`, with no rules yet
    pub fn new(entry: Transition) -> Self {
        Self { entry, rules: BTreeMap::new() }
    }

    /// Add the rule for jobs of `class` completing at `center`
    pub fn with_rule(mut self, center: CenterId, class: JobClass, route: Route) -> Self {
        self.rules.insert((center, class), route);
        self
    }

    /// Transition taken by external arrivals
    pub fn entry(&self) -> &Transition {
        &self.entry
    }

    /// Rule for jobs of `class` completing at `center`
    pub fn route(&self, center: CenterId, class: JobClass) -> SimulationResult<&Route> {
        self.rules.get(&(center, class)).ok_or_else(|| {
            SimulationError::routing_error(format!("no rule for {} completing at {}", class, center))
        })
    }

    /// Resolve where an external arrival enters
    pub fn entry_hop<R: RandomSource + ?Sized>(&self, rng: &mut R) -> SimulationResult<(CenterId, JobClass)> {
        Ok((self.entry.destination.resolve(rng)?, self.entry.class))
    }

    /// Resolve where a job of `class` completing at `center` goes, `None` on exit
    pub fn next_hop<R: RandomSource + ?Sized>(
        &self,
        center: CenterId,
        class: JobClass,
        rng: &mut R,
    ) -> SimulationResult<Option<(CenterId, JobClass)>> {
        match self.route(center, class)? {
            Route::Exit => Ok(None),
            Route::To(transition) => Ok(Some((transition.destination.resolve(rng)?, transition.class))),
        }
    }

    /// Classes that leave the network on completion
    pub fn terminal_classes(&self) -> Vec<JobClass> {
        let mut classes: Vec<JobClass> = self
            .rules
            .iter()
            .filter(|(_, route)| matches!(route, Route::Exit))
            .map(|((_, class), _)| *class)
            .collect();
        classes.sort();
        classes.dedup();
        classes
    }

    /// Check the table against a network of `center_count` centers
    ///
    /// Every referenced center must exist, every `(center, class)` reachable
    /// from the entry needs a rule, balanced groups must suit their policy and
    /// no path may revisit a `(center, class)` state.
    pub fn validate(&self, center_count: usize) -> SimulationResult<()> {
        self.check_transition(&self.entry, center_count)?;
        for ((center, class), route) in &self.rules {
            if center.index() >= center_count {
                return Err(SimulationError::routing_error(format!(
                    "rule for {} at unknown {}",
                    class, center
                )));
            }
            if let Route::To(transition) = route {
                self.check_transition(transition, center_count)?;
            }
        }

        let mut finished = HashSet::new();
        let mut path = Vec::new();
        for (center, _) in self.entry.destination.candidates() {
            self.visit_state((center, self.entry.class), &mut path, &mut finished)?;
        }
        Ok(())
    }

    fn check_transition(&self, transition: &Transition, center_count: usize) -> SimulationResult<()> {
        match &transition.destination {
            Destination::Center(center) if center.index() >= center_count => Err(
                SimulationError::routing_error(format!("transition to unknown {}", center)),
            ),
            Destination::Center(_) => Ok(()),
            Destination::Balanced { replicas, policy } => {
                if replicas.is_empty() {
                    return Err(SimulationError::routing_error("balanced destination without replicas"));
                }
                if let Some(unknown) = replicas.iter().find(|c| c.index() >= center_count) {
                    return Err(SimulationError::routing_error(format!(
                        "balanced destination lists unknown {}",
                        unknown
                    )));
                }
                if let BalancePolicy::Coin { p } = policy {
                    if replicas.len() != 2 {
                        return Err(SimulationError::routing_error(format!(
                            "coin balancing needs exactly 2 replicas, got {}",
                            replicas.len()
                        )));
                    }
                    if !(0.0..=1.0).contains(p) {
                        return Err(SimulationError::routing_error(format!(
                            "coin probability {} outside [0, 1]",
                            p
                        )));
                    }
                }
                Ok(())
            }
        }
    }

    // Depth-first walk over (center, class) states, rejecting cycles
    fn visit_state(
        &self,
        state: (CenterId, JobClass),
        path: &mut Vec<(CenterId, JobClass)>,
        finished: &mut HashSet<(CenterId, JobClass)>,
    ) -> SimulationResult<()> {
        if finished.contains(&state) {
            return Ok(());
        }
        if path.contains(&state) {
            return Err(SimulationError::routing_error(format!(
                "routing cycle through {} at {}",
                state.1, state.0
            )));
        }

        path.push(state);
        if let Route::To(transition) = self.route(state.0, state.1)? {
            for (center, _) in transition.destination.candidates() {
                self.visit_state((center, transition.class), path, finished)?;
            }
        }
        path.pop();
        finished.insert(state);
        Ok(())
    }

    /// Every `(center, class)` state an external arrival can pass through
    pub fn reachable_states(&self) -> SimulationResult<BTreeSet<(CenterId, JobClass)>> {
        let mut reached = BTreeSet::new();
        let mut pending: Vec<(CenterId, JobClass)> = self
            .entry
            .destination
            .candidates()
            .into_iter()
            .map(|(center, _)| (center, self.entry.class))
            .collect();
        while let Some(state) = pending.pop() {
            if !reached.insert(state) {
                continue;
            }
            if let Route::To(transition) = self.route(state.0, state.1)? {
                pending.extend(
                    transition
                        .destination
                        .candidates()
                        .into_iter()
                        .map(|(center, _)| (center, transition.class)),
                );
            }
        }
        Ok(reached)
    }

    /// Expected number of visits an external arrival pays to each center
    pub fn visit_ratios(&self, center_count: usize) -> SimulationResult<Vec<f64>> {
        self.validate(center_count)?;
        let mut ratios = vec![0.0; center_count];
        for (center, weight) in self.entry.destination.candidates() {
            self.accumulate_visits((center, self.entry.class), weight, &mut ratios)?;
        }
        Ok(ratios)
    }

    fn accumulate_visits(
        &self,
        state: (CenterId, JobClass),
        weight: f64,
        ratios: &mut [f64],
    ) -> SimulationResult<()> {
        ratios[state.0.index()] += weight;
        if let Route::To(transition) = self.route(state.0, state.1)? {
            for (center, share) in transition.destination.candidates() {
                self.accumulate_visits((center, transition.class), weight * share, ratios)?;
            }
        }
        Ok(())
    }
}
