// Integration tests exercise the public API of the simulator: individual
// processor-sharing centers, routing tables, batch-means output analysis and
// whole scenario runs driven through the engine and the orchestrator.

use ps_network_simulator::*;

mod service_center_tests;


#[test]
fn test_core_id_types() {
    let run_id = RunId::new();
    assert_ne!(run_id, RunId::new());
    assert!(run_id.to_string().starts_with("RUN_"));

    assert_eq!(CenterId(2).index(), 2);
    assert_ne!(JobClass::A1.service_stream(), StreamId::ARRIVALS);
    assert_ne!(JobClass::P.service_stream(), StreamId::ROUTING);
}

#[test]
fn test_enum_types() {
    let scenarios = [ScenarioKind::SingleServer, ScenarioKind::WebApp, ScenarioKind::Horizontal];
    for scenario in &scenarios {
        let parsed: ScenarioKind = scenario.to_string().parse().unwrap();
        assert_eq!(parsed, *scenario);
    }

    for class in JobClass::ALL {
        assert!(!class.to_string().is_empty());
    }

    let modes = [EstimationMode::FiniteHorizon, EstimationMode::BatchMeans];
    for mode in &modes {
        let parsed: EstimationMode = mode.to_string().parse().unwrap();
        assert_eq!(parsed, *mode);
    }

    let trigger: BatchTrigger = "completions:a3".parse().unwrap();
    assert_eq!(trigger, BatchTrigger::Completions(JobClass::A3));
}

#[test]
fn test_id_json_output_has_prefix() {
    let run_id = RunId::new();
    let json = serde_json::to_string(&run_id).unwrap();
    assert!(json.contains("RUN_"));

    let deserialized: RunId = serde_json::from_str(&json).unwrap();
    assert_eq!(run_id, deserialized);
}

#[test]
fn test_run_result_serialization() {
    let scenario = Scenario::single_server(0.7);
    let engine = SimulationEngine::new(&scenario, 0.5).unwrap();
    let mut rng = MultiStreamRng::new(7);
    let result = engine.run(&RunMode::FiniteHorizon { horizon: 200.0 }, &mut rng).unwrap();

    let json = serde_json::to_string(&result).unwrap();
    let deserialized: RunResult = serde_json::from_str(&json).unwrap();
    assert_eq!(result.counters, deserialized.counters);
    assert_eq!(result.events, deserialized.events);
}
