//! Capacity accounting under contention: the load counter must never
//! exceed `max_concurrent`, no matter how many threads race for it.

use routing_core::{
    alert::{AlertContext, AlertPriority},
    config::RoutingConfig,
    directory::AgentProfile,
    engine::{RouteOutcome, RoutingEngine},
    stats::UnassignedReason,
    store::RouteStore,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

fn engine_with_agents(agents: &[(&str, u32)]) -> Arc<RoutingEngine> {
    let store = Arc::new(RouteStore::in_memory().expect("open in-memory store"));
    store.migrate().expect("migrate");
    for (id, capacity) in agents {
        store
            .upsert_agent(&AgentProfile {
                agent_id: id.to_string(),
                max_concurrent: *capacity,
                current_load: 0,
                territories: BTreeSet::new(),
                skills: BTreeSet::new(),
                specializations: BTreeSet::new(),
                available: true,
                auto_assign: true,
            })
            .unwrap();
    }
    seed_catch_all(&store);
    Arc::new(RoutingEngine::new(store, RoutingConfig::default()))
}

fn seed_catch_all(store: &RouteStore) {
    let seed: routing_core::config::RuleSeed = serde_json::from_value(serde_json::json!({
        "id": "catch-all",
        "name": "Catch all",
        "priority": 0,
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

#[test]
fn concurrent_routing_never_exceeds_total_capacity() {
    // Three agents, seven total slots, sixteen threads racing.
    let engine = engine_with_agents(&[("alpha", 2), ("bravo", 3), ("charlie", 2)]);
    let total_capacity = 7;
    let thread_count = 16;

    let handles: Vec<_> = (0..thread_count)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.route(&ctx(&format!("alert-{i}"))).unwrap())
        })
        .collect();

    let mut assigned = 0;
    let mut unassigned = 0;
    for handle in handles {
        match handle.join().unwrap() {
            RouteOutcome::Assigned { .. } => assigned += 1,
            RouteOutcome::Unassigned {
                reason: UnassignedReason::NoEligibleAgent,
            } => unassigned += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_eq!(assigned, total_capacity);
    assert_eq!(unassigned, thread_count - total_capacity);

    let store = engine.store();
    for (id, capacity) in [("alpha", 2), ("bravo", 3), ("charlie", 2)] {
        let load = store.agent_load(id).unwrap();
        assert!(
            load <= capacity,
            "agent '{id}' load {load} exceeds capacity {capacity}"
        );
    }
    // Every reservation is accounted for.
    let total_load: i64 = ["alpha", "bravo", "charlie"]
        .iter()
        .map(|id| store.agent_load(id).unwrap())
        .sum();
    assert_eq!(total_load, total_capacity as i64);
}

#[test]
fn resolve_frees_capacity_for_the_next_alert() {
    let engine = engine_with_agents(&[("solo", 1)]);

    assert!(matches!(
        engine.route(&ctx("first")).unwrap(),
        RouteOutcome::Assigned { .. }
    ));
    assert_eq!(
        engine.route(&ctx("second")).unwrap(),
        RouteOutcome::Unassigned {
            reason: UnassignedReason::NoEligibleAgent
        }
    );

    engine
        .resolve("first", routing_core::assignment::OutcomeKind::Success)
        .unwrap();
    assert_eq!(engine.store().agent_load("solo").unwrap(), 0);

    assert!(matches!(
        engine.route(&ctx("third")).unwrap(),
        RouteOutcome::Assigned { .. }
    ));
}

#[test]
fn release_below_zero_is_clamped_and_logged_as_an_anomaly() {
    let engine = engine_with_agents(&[("solo", 1)]);

    // Load is 0; a release now has nothing to give back.
    engine.directory().release("solo").unwrap();

    assert_eq!(engine.store().agent_load("solo").unwrap(), 0);
    let anomalies = engine.store().events_by_type("capacity_anomaly").unwrap();
    assert_eq!(anomalies.len(), 1);
    assert!(anomalies[0].payload.contains("solo"));
}

#[test]
fn reserve_fails_for_unavailable_agents() {
    let engine = engine_with_agents(&[("solo", 5)]);
    let store = engine.store();

    store.set_agent_available("solo", false).unwrap();
    assert!(!store.try_reserve("solo").unwrap());
    store.set_agent_available("solo", true).unwrap();
    assert!(store.try_reserve("solo").unwrap());
}
