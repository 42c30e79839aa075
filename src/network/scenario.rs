//! Scenario catalogue
//!
//! A scenario is a configuration value: the list of centers, the mean
//! service demand of every job class and the routing table. One generic
//! [`ServiceCenter`](super::ServiceCenter) and one loop serve all of them.
//!
//! # Shapes
//!
//! - **single-server**: one center, `A1` jobs leave after one visit
//! - **web-app**: `A1 -> B -> A2 -> P -> A3 -> exit` over centers A, B, P
//! - **horizontal**: the web-app flow with A replicated behind a balancer

use super::{BalancePolicy, Route, RoutingTable, Transition};
use crate::simulation::{SimulationError, SimulationResult};
use crate::types::{AuthProfile, BalancePolicyKind, BatchTrigger, CenterId, JobClass, ScenarioKind, SimulationConfig};
use std::collections::BTreeMap;

/// Mean service demands of the web-app tiers
pub mod demands {
    /// First front-end visit
    pub const A1: f64 = 0.2;
    /// Second front-end visit
    pub const A2: f64 = 0.4;
    /// Third front-end visit, basic authorization
    pub const A3_BASIC: f64 = 0.1;
    /// Third front-end visit, extended authorization
    pub const A3_EXTENDED: f64 = 0.15;
    /// Back end before the improvement
    pub const B: f64 = 0.8;
    /// Back end after the improvement
    pub const B_IMPROVED: f64 = 0.4;
    /// Payment tier, basic authorization
    pub const P_BASIC: f64 = 0.4;
    /// Payment tier, extended authorization
    pub const P_EXTENDED: f64 = 0.7;
}

/// Mean exponential service demand per job class
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceDemands {
    means: BTreeMap<JobClass, f64>,
}

impl ServiceDemands {
    /// No class has a demand yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mean demand of `class`
    pub fn with(mut self, class: JobClass, mean: f64) -> Self {
        self.means.insert(class, mean);
        self
    }

    /// Mean demand of `class`
    pub fn mean(&self, class: JobClass) -> SimulationResult<f64> {
        self.means
            .get(&class)
            .copied()
            .ok_or_else(|| SimulationError::configuration_error(format!("no service demand for class {}", class)))
    }

    /// Classes with a demand, in class order
    pub fn classes(&self) -> impl Iterator<Item = (JobClass, f64)> + '_ {
        self.means.iter().map(|(class, mean)| (*class, *mean))
    }
}

/// Topology and workload of one network
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Which catalogue entry this is
    pub kind: ScenarioKind,
    /// Center names, indexed by [`CenterId`]
    pub centers: Vec<String>,
    /// Service demand per class
    pub demands: ServiceDemands,
    /// Where jobs go on arrival and completion
    pub routing: RoutingTable,
    /// Class whose completions close a batch by default
    pub reference_class: JobClass,
}

impl Scenario {
    /// One processor-sharing center with exponential demand `mean_service`
    pub fn single_server(mean_service: f64) -> Self {
        let a = CenterId(0);
        Self {
            kind: ScenarioKind::SingleServer,
            centers: vec!["A".to_string()],
            demands: ServiceDemands::new().with(JobClass::A1, mean_service),
            routing: RoutingTable::new(Transition::to(a, JobClass::A1)).with_rule(a, JobClass::A1, Route::Exit),
            reference_class: JobClass::A1,
        }
    }

    /// Front end A, back end B and payment tier P in the A-B-A-P-A flow
    pub fn web_app(auth: AuthProfile, improved_backend: bool) -> Self {
        let (a, b, p) = (CenterId(0), CenterId(1), CenterId(2));
        let routing = RoutingTable::new(Transition::to(a, JobClass::A1))
            .with_rule(a, JobClass::A1, Route::to(b, JobClass::B))
            .with_rule(b, JobClass::B, Route::to(a, JobClass::A2))
            .with_rule(a, JobClass::A2, Route::to(p, JobClass::P))
            .with_rule(p, JobClass::P, Route::to(a, JobClass::A3))
            .with_rule(a, JobClass::A3, Route::Exit);
        let backend = if improved_backend { demands::B_IMPROVED } else { demands::B };

        Self {
            kind: ScenarioKind::WebApp,
            centers: vec!["A".to_string(), "B".to_string(), "P".to_string()],
            demands: web_app_demands(auth, backend),
            routing,
            reference_class: JobClass::A3,
        }
    }

    /// The web-app flow with `replicas` front ends, every visit to A balanced
    ///
    /// Replicas take the first indices, followed by B and P. The back end
    /// runs at its improved demand.
    pub fn horizontal(replicas: usize, policy: BalancePolicy, auth: AuthProfile) -> Self {
        let fronts: Vec<CenterId> = (0..replicas).map(CenterId).collect();
        let b = CenterId(replicas);
        let p = CenterId(replicas + 1);

        let mut routing = RoutingTable::new(Transition::balanced(fronts.clone(), policy, JobClass::A1))
            .with_rule(b, JobClass::B, Route::balanced(fronts.clone(), policy, JobClass::A2))
            .with_rule(p, JobClass::P, Route::balanced(fronts.clone(), policy, JobClass::A3));
        for &front in &fronts {
            routing = routing
                .with_rule(front, JobClass::A1, Route::to(b, JobClass::B))
                .with_rule(front, JobClass::A2, Route::to(p, JobClass::P))
                .with_rule(front, JobClass::A3, Route::Exit);
        }

        let mut centers: Vec<String> = (1..=replicas).map(|i| format!("A-{}", i)).collect();
        centers.push("B".to_string());
        centers.push("P".to_string());

        Self {
            kind: ScenarioKind::Horizontal,
            centers,
            demands: web_app_demands(auth, demands::B_IMPROVED),
            routing,
            reference_class: JobClass::A3,
        }
    }

    /// Build the scenario a configuration asks for and check it
    pub fn from_config(config: &SimulationConfig) -> SimulationResult<Self> {
        let scenario = match config.scenario {
            ScenarioKind::SingleServer => Self::single_server(config.mean_service),
            ScenarioKind::WebApp => Self::web_app(config.auth_profile, config.improved_backend),
            ScenarioKind::Horizontal => {
                let policy = match config.balance_policy {
                    BalancePolicyKind::Uniform => BalancePolicy::Uniform,
                    BalancePolicyKind::Coin => BalancePolicy::Coin { p: config.balance_probability },
                };
                Self::horizontal(config.replicas, policy, config.auth_profile)
            }
        };
        scenario.validate()?;
        Ok(scenario)
    }

    /// Number of centers
    pub fn center_count(&self) -> usize {
        self.centers.len()
    }

    /// Name of `center`
    pub fn center_name(&self, center: CenterId) -> &str {
        self.centers.get(center.index()).map(String::as_str).unwrap_or("?")
    }

    /// Check routing closure and that every routed class has a positive demand
    pub fn validate(&self) -> SimulationResult<()> {
        self.routing.validate(self.center_count())?;

        let mut classes = vec![self.routing.entry().class];
        for class in JobClass::ALL {
            for index in 0..self.center_count() {
                if let Ok(Route::To(transition)) = self.routing.route(CenterId(index), class) {
                    classes.push(transition.class);
                }
            }
        }
        for class in classes {
            let mean = self.demands.mean(class)?;
            if !(mean.is_finite() && mean > 0.0) {
                return Err(SimulationError::configuration_error(format!(
                    "service demand of {} must be positive, got {}",
                    class, mean
                )));
            }
        }
        Ok(())
    }

    /// Check that `trigger` can fire in this network
    ///
    /// A completion trigger names a class that must complete at some center
    /// an external arrival can reach; otherwise no batch would ever close.
    pub fn check_batch_trigger(&self, trigger: BatchTrigger) -> SimulationResult<()> {
        match trigger {
            BatchTrigger::ExternalArrivals => Ok(()),
            BatchTrigger::Completions(class) => {
                let reachable = self.routing.reachable_states()?;
                if reachable.iter().any(|&(_, reached)| reached == class) {
                    Ok(())
                } else {
                    Err(SimulationError::configuration_error(format!(
                        "batch trigger {} never fires in the {} scenario: no reachable center completes {} jobs",
                        trigger, self.kind, class
                    )))
                }
            }
        }
    }

    /// Expected visits per external arrival, per center
    pub fn visit_ratios(&self) -> SimulationResult<Vec<f64>> {
        self.routing.visit_ratios(self.center_count())
    }
}

fn web_app_demands(auth: AuthProfile, backend: f64) -> ServiceDemands {
    let (a3, p) = match auth {
        AuthProfile::Basic => (demands::A3_BASIC, demands::P_BASIC),
        AuthProfile::Extended => (demands::A3_EXTENDED, demands::P_EXTENDED),
    };
    ServiceDemands::new()
        .with(JobClass::A1, demands::A1)
        .with(JobClass::A2, demands::A2)
        .with(JobClass::A3, a3)
        .with(JobClass::B, backend)
        .with(JobClass::P, p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_server_shape() {
        let scenario = Scenario::single_server(0.7);
        scenario.validate().unwrap();
        assert_eq!(scenario.center_count(), 1);
        assert_eq!(scenario.visit_ratios().unwrap(), vec![1.0]);
        assert_eq!(scenario.demands.mean(JobClass::A1).unwrap(), 0.7);
    }

    #[test]
    fn test_web_app_visit_ratios() {
        let scenario = Scenario::web_app(AuthProfile::Basic, false);
        scenario.validate().unwrap();
        assert_eq!(scenario.visit_ratios().unwrap(), vec![3.0, 1.0, 1.0]);
        assert_eq!(scenario.routing.terminal_classes(), vec![JobClass::A3]);
    }

    #[test]
    fn test_web_app_profiles() {
        let improved = Scenario::web_app(AuthProfile::Extended, true);
        assert_eq!(improved.demands.mean(JobClass::B).unwrap(), demands::B_IMPROVED);
        assert_eq!(improved.demands.mean(JobClass::P).unwrap(), demands::P_EXTENDED);
        assert_eq!(improved.demands.mean(JobClass::A3).unwrap(), demands::A3_EXTENDED);
    }

    #[test]
    fn test_horizontal_visit_ratios() {
        let scenario = Scenario::horizontal(2, BalancePolicy::Coin { p: 0.5 }, AuthProfile::Basic);
        scenario.validate().unwrap();
        let ratios = scenario.visit_ratios().unwrap();
        assert_eq!(ratios.len(), 4);
        assert!((ratios[0] - 1.5).abs() < 1e-12);
        assert!((ratios[1] - 1.5).abs() < 1e-12);
        assert_eq!(&ratios[2..], &[1.0, 1.0]);
        assert_eq!(scenario.center_name(CenterId(2)), "B");
    }

    #[test]
    fn test_batch_trigger_must_be_reachable() {
        let single = Scenario::single_server(0.7);
        single.check_batch_trigger(BatchTrigger::Completions(JobClass::A1)).unwrap();
        single.check_batch_trigger(BatchTrigger::ExternalArrivals).unwrap();
        assert!(matches!(
            single.check_batch_trigger(BatchTrigger::Completions(JobClass::B)),
            Err(SimulationError::ConfigurationError(_))
        ));

        let web = Scenario::web_app(AuthProfile::Basic, false);
        for class in JobClass::ALL {
            web.check_batch_trigger(BatchTrigger::Completions(class)).unwrap();
        }
    }

    #[test]
    fn test_from_config_rejects_bad_demand() {
        let config = SimulationConfig { mean_service: -1.0, ..Default::default() };
        assert!(Scenario::from_config(&config).is_err());
    }

    #[test]
    fn test_from_config_uniform_replicas() {
        let config = SimulationConfig {
            scenario: ScenarioKind::Horizontal,
            replicas: 3,
            balance_policy: BalancePolicyKind::Uniform,
            ..Default::default()
        };
        let scenario = Scenario::from_config(&config).unwrap();
        assert_eq!(scenario.center_count(), 5);
        let total: f64 = scenario.visit_ratios().unwrap()[..3].iter().sum();
        assert!((total - 3.0).abs() < 1e-12);
    }
}
