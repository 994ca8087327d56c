//! Administrative surface: single-record lookups and profile updates that
//! arrive from outside the routing path.

use routing_core::{
    alert::{AlertContext, AlertPriority},
    config::{RoutingConfig, RuleSeed},
    directory::{AgentDirectory, AgentProfile},
    engine::{RouteOutcome, RoutingEngine},
    error::RoutingError,
    rule::{Action, Condition},
    stats::UnassignedReason,
    store::RouteStore,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

fn store() -> Arc<RouteStore> {
    let store = Arc::new(RouteStore::in_memory().expect("open in-memory store"));
    store.migrate().expect("migrate");
    store
}

fn seed_rule(store: &RouteStore, value: serde_json::Value) {
    let seed: RuleSeed = serde_json::from_value(value).expect("valid rule seed");
    store.insert_rule(&seed).unwrap();
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
fn get_rule_returns_the_resolved_record() {
    let store = store();
    seed_rule(
        &store,
        json!({
            "id": "confident", "name": "Confident alerts", "priority": 10,
            "conditions": [{"field": "confidence", "operator": "greater_than", "value": 0.5}],
            "actions": [{"type": "assign_round_robin", "params": {}}],
        }),
    );

    let rule = store.get_rule("confident").unwrap();
    assert_eq!(rule.id, "confident");
    assert_eq!(rule.priority, 10);
    assert!(rule.enabled);
    assert_eq!(
        rule.conditions,
        vec![Condition::GreaterThan {
            field: "confidence".into(),
            value: 0.5,
        }]
    );
    assert_eq!(rule.actions, vec![Action::AssignRoundRobin]);
}

#[test]
fn get_rule_surfaces_a_malformed_stored_rule() {
    let store = store();
    seed_rule(
        &store,
        json!({
            "id": "broken", "name": "Broken", "priority": 10,
            "conditions": [{"field": "confidence", "operator": "regex", "value": ".*"}],
            "actions": [{"type": "assign_round_robin", "params": {}}],
        }),
    );

    // The routing path degrades a malformed rule to never-matching, but a
    // direct lookup must say loudly that the stored record is bad.
    let err = store.get_rule("broken").unwrap_err();
    assert!(matches!(err, RoutingError::ConsistencyViolation { .. }));
}

#[test]
fn get_rule_rejects_an_unknown_id() {
    let store = store();
    let err = store.get_rule("no-such-rule").unwrap_err();
    assert!(matches!(
        err,
        RoutingError::RuleNotFound { ref rule_id } if rule_id == "no-such-rule"
    ));
}

#[test]
fn capacity_update_changes_eligibility_immediately() {
    let store = store();
    seed_agent(&store, "solo", 1);
    seed_rule(
        &store,
        json!({
            "id": "catch-all", "name": "Catch all", "priority": 0,
            "conditions": [],
            "actions": [{"type": "assign_round_robin", "params": {}}],
        }),
    );
    let engine = RoutingEngine::new(Arc::clone(&store), RoutingConfig::default());

    assert!(matches!(
        engine.route(&ctx("alert-1")).unwrap(),
        RouteOutcome::Assigned { .. }
    ));
    assert_eq!(
        engine.route(&ctx("alert-2")).unwrap(),
        RouteOutcome::Unassigned {
            reason: UnassignedReason::NoEligibleAgent
        }
    );

    // Raising the ceiling frees the agent without touching its load.
    store.set_agent_capacity("solo", 2).unwrap();
    assert!(matches!(
        engine.route(&ctx("alert-3")).unwrap(),
        RouteOutcome::Assigned { .. }
    ));
    assert_eq!(store.agent_load("solo").unwrap(), 2);
}

#[test]
fn capacity_update_rejects_an_unknown_agent() {
    let store = store();
    let err = store.set_agent_capacity("ghost", 5).unwrap_err();
    assert!(matches!(
        err,
        RoutingError::AgentNotFound { ref agent_id } if agent_id == "ghost"
    ));
}

#[test]
fn directory_get_reads_one_profile() {
    let store = store();
    seed_agent(&store, "alpha", 3);
    let directory = AgentDirectory::new(Arc::clone(&store));

    let profile = directory.get("alpha").unwrap();
    assert_eq!(profile.agent_id, "alpha");
    assert_eq!(profile.max_concurrent, 3);
    assert_eq!(profile.current_load, 0);

    let err = directory.get("ghost").unwrap_err();
    assert!(matches!(
        err,
        RoutingError::AgentNotFound { ref agent_id } if agent_id == "ghost"
    ));
}
