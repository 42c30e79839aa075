//! Tests for processor-sharing service centers
//!
//! These tests drive a single center through scripted arrival and completion
//! sequences and check the sharing discipline, the time integrals and the
//! separation between physical state and observation statistics.

use ps_network_simulator::network::{time_tolerance, Job, ServiceCenter};
use ps_network_simulator::simulation::SimulationError;
use ps_network_simulator::types::{CenterId, JobClass};

fn center() -> ServiceCenter {
    ServiceCenter::new(CenterId(0), "A")
}

/// Complete the next job at the time its completion is due
fn complete_due(center: &mut ServiceCenter) -> Job {
    let due = center.last_event_time() + center.next_completion_offset().unwrap();
    center.complete_next(due).unwrap()
}

/// Test that two jobs sharing the server progress at half speed each
#[test]
fn test_processor_sharing_exact_schedule() {
    let mut center = center();
    center.accept_arrival(Job::new(JobClass::A1, 0.0, 1.0)).unwrap();
    center.accept_arrival(Job::new(JobClass::A1, 0.0, 2.0)).unwrap();

    // Two residents: the short job needs 1.0 at half capacity
    assert_eq!(center.next_completion_offset().unwrap(), 2.0);
    let first = center.complete_next(2.0).unwrap();
    assert_eq!(first.arrival_time, 0.0);
    assert_eq!(center.jobs()[0].remaining_service, 1.0);

    assert_eq!(center.next_completion_offset().unwrap(), 1.0);
    center.complete_next(3.0).unwrap();
    assert!(center.is_empty());

    let integrals = center.integrals();
    assert!((integrals.population - 5.0).abs() < 1e-12);
    assert!((integrals.busy - 3.0).abs() < 1e-12);

    let snapshot = center.snapshot(3.0).unwrap();
    assert_eq!(snapshot.departed, 2);
    assert!((snapshot.mean_sojourn - 2.5).abs() < 1e-12);
    assert!((snapshot.mean_population - 5.0 / 3.0).abs() < 1e-12);
    assert!((snapshot.utilization - 1.0).abs() < 1e-12);
}

/// Test that busy time equals the total demand served (work conservation)
#[test]
fn test_work_conservation_with_idle_gap() {
    let mut center = center();
    center.accept_arrival(Job::new(JobClass::A1, 0.0, 1.0)).unwrap();
    center.accept_arrival(Job::new(JobClass::A1, 0.4, 0.5)).unwrap();

    let short = complete_due(&mut center);
    assert!((short.arrival_time - 0.4).abs() < 1e-12);
    assert!((center.last_event_time() - 1.4).abs() < 1e-12);

    complete_due(&mut center);
    assert!((center.last_event_time() - 1.5).abs() < 1e-12);

    // Idle until the next arrival
    center.accept_arrival(Job::new(JobClass::A1, 3.0, 0.25)).unwrap();
    complete_due(&mut center);

    let integrals = center.integrals();
    assert!((integrals.busy - 1.75).abs() < 1e-12);
    assert!(integrals.busy <= center.last_event_time());
    assert_eq!(center.lifetime_arrivals(), 3);
    assert_eq!(center.lifetime_departures(), 3);
}

/// Test that the integrals never decrease as time advances
#[test]
fn test_integrals_are_monotonic() {
    let mut center = center();
    let demands = [0.3, 1.2, 0.7, 0.1, 2.0];
    let mut previous = center.integrals();
    let mut now = 0.0;

    for (i, demand) in demands.iter().enumerate() {
        now += 0.25 * (i + 1) as f64;
        center.accept_arrival(Job::new(JobClass::A1, now, *demand)).unwrap();
        let current = center.integrals();
        assert!(current.population >= previous.population);
        assert!(current.busy >= previous.busy);
        assert!(current.busy <= now);
        previous = current;
    }

    while !center.is_empty() {
        complete_due(&mut center);
        let current = center.integrals();
        assert!(current.population >= previous.population);
        assert!(current.busy >= previous.busy);
        previous = current;
    }

    let total: f64 = demands.iter().sum();
    assert!((previous.busy - total).abs() < 1e-9);
}

/// Test that resetting statistics keeps residents and lifetime counts
#[test]
fn test_reset_preserves_physical_state() {
    let mut center = center();
    center.accept_arrival(Job::new(JobClass::A2, 0.0, 4.0)).unwrap();
    center.accept_arrival(Job::new(JobClass::A3, 1.0, 0.5)).unwrap();
    complete_due(&mut center);

    let residents = center.jobs().to_vec();
    center.reset_statistics();

    assert_eq!(center.jobs(), residents.as_slice());
    assert_eq!(center.population(), 1);
    assert_eq!(center.departed_count(), 0);
    assert_eq!(center.lifetime_arrivals(), 2);
    assert_eq!(center.lifetime_departures(), 1);
    assert_eq!(center.integrals().busy, 0.0);
    assert_eq!(center.sojourn_stats().count(), 0);
    assert_eq!(center.interarrival_stats().count(), 0);
}

/// Test that rebasing shifts the clock without touching remaining service
#[test]
fn test_rebase_keeps_remaining_service() {
    let mut center = center();
    center.accept_arrival(Job::new(JobClass::A1, 10.0, 3.0)).unwrap();
    center.advance(11.0).unwrap();
    let remaining = center.jobs()[0].remaining_service;

    center.rebase(11.0);
    assert_eq!(center.last_event_time(), 0.0);
    assert_eq!(center.jobs()[0].remaining_service, remaining);
    assert!((center.next_completion_offset().unwrap() - 2.0).abs() < 1e-12);

    center.complete_next(center.next_completion_offset().unwrap()).unwrap();
    assert!(center.is_empty());
}

/// Test that a completion with no finished job is an invariant violation
#[test]
fn test_premature_completion_rejected() {
    let mut center = center();
    center.accept_arrival(Job::new(JobClass::A1, 0.0, 1.0)).unwrap();

    let result = center.complete_next(0.5);
    assert!(matches!(result, Err(SimulationError::InvariantViolation { .. })));
}

/// Test that moving a center backwards in time is rejected
#[test]
fn test_backwards_advance_rejected() {
    let mut center = center();
    center.accept_arrival(Job::new(JobClass::A1, 5.0, 1.0)).unwrap();
    assert!(center.advance(4.0).is_err());

    // Drift within the tolerance is absorbed
    let drift = 5.0 - time_tolerance(5.0) / 2.0;
    center.advance(drift).unwrap();
}

/// Test that a snapshot over an empty window is degenerate
#[test]
fn test_snapshot_without_departures_is_degenerate() {
    let mut center = center();
    center.accept_arrival(Job::new(JobClass::A1, 0.0, 1.0)).unwrap();

    assert!(matches!(
        center.snapshot(0.5),
        Err(SimulationError::DegenerateStatistics { .. })
    ));
    assert!(center.snapshot(0.0).is_err());
}
