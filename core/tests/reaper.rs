//! Stale-work sweep: recovery, escalation fallback, and idempotence.

use routing_core::{
    alert::{AlertContext, AlertPriority},
    assignment::{AssignmentStatus, OutcomeKind},
    config::{RoutingConfig, RuleSeed},
    directory::AgentProfile,
    engine::{RouteOutcome, RoutingEngine},
    reaper::StaleDisposition,
    store::RouteStore,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

fn engine() -> RoutingEngine {
    let store = Arc::new(RouteStore::in_memory().expect("open in-memory store"));
    store.migrate().expect("migrate");
    RoutingEngine::new(store, RoutingConfig::default())
}

fn seed_agent(store: &RouteStore, id: &str, capacity: u32) {
    store
        .upsert_agent(&AgentProfile {
            agent_id: id.to_string(),
            max_concurrent: capacity,
            current_load: 0,
            territories: BTreeSet::new(),
            skills: BTreeSet::new(),
            specializations: BTreeSet::new(),
            available: true,
            auto_assign: true,
        })
        .unwrap();
}

fn seed_catch_all(store: &RouteStore) {
    let seed: RuleSeed = serde_json::from_value(json!({
        "id": "catch-all", "name": "Catch all", "priority": 0,
        "conditions": [],
        "actions": [{"type": "assign_round_robin", "params": {}}],
    }))
    .unwrap();
    store.insert_rule(&seed).unwrap();
}

fn ctx(alert_id: &str) -> AlertContext {
    AlertContext {
        alert_id: alert_id.to_string(),
        user_id: "user-1".into(),
        alert_type: "sell_intent".into(),
        confidence: 0.9,
        priority: AlertPriority::High,
        territory: None,
    }
}

/// Route an alert and backdate its assignment so the sweep sees it.
fn route_and_backdate(engine: &RoutingEngine, alert_id: &str, days: i64) -> String {
    match engine.route(&ctx(alert_id)).unwrap() {
        RouteOutcome::Assigned { assignment_id, .. } => {
            engine
                .store()
                .backdate_assignment(&assignment_id, days)
                .unwrap();
            assignment_id
        }
        other => panic!("expected an assignment, got {other:?}"),
    }
}

#[test]
fn stale_assignment_moves_to_another_agent() {
    let engine = engine();
    seed_agent(engine.store(), "alpha", 5);
    seed_agent(engine.store(), "bravo", 5);
    seed_catch_all(engine.store());

    route_and_backdate(&engine, "alert-1", 5);
    let results = engine.handle_stale(3).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].alert_id, "alert-1");
    assert_eq!(
        results[0].disposition,
        StaleDisposition::Reassigned {
            agent_id: "bravo".to_string()
        }
    );
    // The original agent is no longer carrying the alert.
    assert_eq!(engine.store().agent_load("alpha").unwrap(), 0);
    assert_eq!(engine.store().agent_load("bravo").unwrap(), 1);
}

#[test]
fn fresh_assignments_are_left_alone() {
    let engine = engine();
    seed_agent(engine.store(), "alpha", 5);
    seed_catch_all(engine.store());

    engine.route(&ctx("alert-1")).unwrap();
    let results = engine.handle_stale(3).unwrap();
    assert!(results.is_empty());
    assert_eq!(engine.store().agent_load("alpha").unwrap(), 1);
}

#[test]
fn sweep_escalates_when_nobody_else_can_take_the_alert() {
    let engine = engine();
    seed_agent(engine.store(), "solo", 5);
    seed_catch_all(engine.store());

    route_and_backdate(&engine, "alert-1", 5);
    // The only agent is the one being excluded, so re-routing fails and
    // the alert lands with the supervisory queue.
    let results = engine.handle_stale(3).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].disposition, StaleDisposition::Escalated);

    let escalated = engine
        .store()
        .assignment_status_count(AssignmentStatus::Escalated)
        .unwrap();
    assert_eq!(escalated, 1);
    assert_eq!(engine.store().agent_load("solo").unwrap(), 0);
}

#[test]
fn second_sweep_over_the_same_data_changes_nothing() {
    let engine = engine();
    seed_agent(engine.store(), "alpha", 5);
    seed_agent(engine.store(), "bravo", 5);
    seed_catch_all(engine.store());

    route_and_backdate(&engine, "alert-1", 5);
    let first = engine.handle_stale(3).unwrap();
    assert_eq!(first.len(), 1);

    // The replacement assignment is fresh, so the second sweep scans
    // nothing and moves nothing.
    let second = engine.handle_stale(3).unwrap();
    assert!(second.is_empty());
    assert_eq!(engine.store().assignment_count().unwrap(), 2);
    assert_eq!(engine.store().agent_load("bravo").unwrap(), 1);
}

#[test]
fn resolved_alerts_never_reappear_in_a_sweep() {
    let engine = engine();
    seed_agent(engine.store(), "alpha", 5);
    seed_catch_all(engine.store());

    let assignment_id = route_and_backdate(&engine, "alert-1", 5);
    engine.resolve("alert-1", OutcomeKind::Success).unwrap();
    // Still backdated, but terminal: the scan must not pick it up.
    engine
        .store()
        .backdate_assignment(&assignment_id, 5)
        .unwrap();

    let results = engine.handle_stale(3).unwrap();
    assert!(results.is_empty());
}

#[test]
fn mixed_batch_processes_every_candidate() {
    let engine = engine();
    seed_agent(engine.store(), "alpha", 5);
    seed_agent(engine.store(), "bravo", 5);
    seed_catch_all(engine.store());

    // Two stale alerts assigned round-robin to alpha and bravo, one fresh.
    route_and_backdate(&engine, "stale-1", 5);
    route_and_backdate(&engine, "stale-2", 5);
    engine.route(&ctx("fresh")).unwrap();

    let results = engine.handle_stale(3).unwrap();
    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(
            matches!(result.disposition, StaleDisposition::Reassigned { .. }),
            "alert '{}' was not reassigned: {:?}",
            result.alert_id,
            result.disposition
        );
    }

    let sweeps = engine
        .store()
        .events_by_type("stale_sweep_completed")
        .unwrap();
    assert_eq!(sweeps.len(), 1);
    let payload: serde_json::Value = serde_json::from_str(&sweeps[0].payload).unwrap();
    assert_eq!(payload["scanned"], 2);
    assert_eq!(payload["reassigned"], 2);
}
