//! route-runner: headless driver for the alert routing engine.
//!
//! Stands in for the external API/scheduler layer: seeds rules and agents,
//! routes a batch of alerts, resolves a fraction, then ages the remainder
//! and runs the stale-work reaper.
//!
//! Usage:
//!   route-runner --alerts 50 --db run.db
//!   route-runner --rules rules.json --agents agents.json --config engine.json

use anyhow::Result;
use routing_core::{
    alert::{AlertContext, AlertPriority},
    assignment::OutcomeKind,
    config::{AgentCatalogFile, AgentSeed, RoutingConfig, RuleCatalogFile, RuleSeed},
    engine::{RouteOutcome, RoutingEngine},
    reaper::StaleDisposition,
    rule::{RawAction, RawCondition},
    store::RouteStore,
};
use std::collections::BTreeSet;
use std::env;
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let alerts = parse_arg(&args, "--alerts", 50u64);
    let stale_days = parse_arg(&args, "--stale-days", -1i64);
    let db = flag_value(&args, "--db").unwrap_or(":memory:");

    let config = match flag_value(&args, "--config") {
        Some(path) => RoutingConfig::from_file(Path::new(path))?,
        None => RoutingConfig::default(),
    };
    let stale_days = if stale_days >= 0 {
        stale_days
    } else {
        config.default_stale_age_days
    };

    println!("route-runner");
    println!("  alerts:     {alerts}");
    println!("  db:         {db}");
    println!("  stale days: {stale_days}");
    println!();

    let store = Arc::new(if db == ":memory:" {
        RouteStore::in_memory()?
    } else {
        RouteStore::open(db)?
    });
    store.migrate()?;
    log::debug!("schema migrated at {db}");

    seed_rules(&store, flag_value(&args, "--rules"))?;
    seed_agents(&store, flag_value(&args, "--agents"))?;
    println!(
        "seeded {} rules, {} agents",
        store.rule_count()?,
        store.agent_count()?
    );

    let engine = RoutingEngine::new(Arc::clone(&store), config);

    // Route the batch.
    let (mut assigned, mut escalated, mut unassigned) = (0u64, 0u64, 0u64);
    let mut assigned_alerts: Vec<String> = Vec::new();
    for i in 0..alerts {
        let ctx = synthetic_alert(i);
        match engine.route(&ctx)? {
            RouteOutcome::Assigned { .. } => {
                assigned += 1;
                assigned_alerts.push(ctx.alert_id);
            }
            RouteOutcome::Escalated { .. } => escalated += 1,
            RouteOutcome::Unassigned { .. } => unassigned += 1,
        }
    }
    println!("routed {alerts}: {assigned} assigned, {escalated} escalated, {unassigned} unassigned");

    // Resolve the first half; leave the rest to go stale.
    let resolve_count = assigned_alerts.len() / 2;
    for alert_id in assigned_alerts.iter().take(resolve_count) {
        engine.resolve(alert_id, OutcomeKind::Success)?;
    }
    println!("resolved {resolve_count} alerts");

    // Age the survivors past the threshold, then sweep.
    for alert_id in assigned_alerts.iter().skip(resolve_count) {
        if let Some(active) = store.get_active_assignment(alert_id)? {
            store.backdate_assignment(&active.assignment_id, stale_days + 1)?;
        }
    }
    let results = engine.handle_stale(stale_days)?;
    let reaped = results
        .iter()
        .filter(|r| matches!(r.disposition, StaleDisposition::Reassigned { .. }))
        .count();
    let parked = results
        .iter()
        .filter(|r| r.disposition == StaleDisposition::Escalated)
        .count();
    println!("stale sweep: {} scanned, {reaped} reassigned, {parked} escalated", results.len());
    println!();

    print_stats(&engine);
    Ok(())
}

fn print_stats(engine: &RoutingEngine) {
    let snapshot = engine.stats().snapshot();
    println!("── statistics ──");
    for ((rule_id, outcome), count) in &snapshot.by_rule {
        println!("  rule {rule_id:<24} {outcome:<18} {count}");
    }
    for ((agent_id, outcome), count) in &snapshot.by_agent {
        println!("  agent {agent_id:<23} {outcome:<18} {count}");
    }
    for (reason, count) in &snapshot.unassigned {
        println!("  unassigned {reason:<18} {count}");
    }
}

/// Deterministic synthetic alert batch: cycles types, territories, and
/// confidence bands so every rule in the demo set gets exercised.
fn synthetic_alert(i: u64) -> AlertContext {
    let territories = ["SF", "LA", "NYC"];
    let priorities = [
        AlertPriority::Low,
        AlertPriority::Medium,
        AlertPriority::High,
        AlertPriority::Urgent,
    ];
    let alert_types = ["sell_intent", "buy_intent", "refinance_intent"];
    AlertContext {
        alert_id: format!("alert-{i:04}"),
        user_id: format!("user-{:03}", i % 17),
        alert_type: alert_types[(i % 3) as usize].to_string(),
        confidence: 0.5 + (i % 50) as f64 / 100.0,
        priority: priorities[(i % 4) as usize],
        territory: Some(territories[(i % 3) as usize].to_string()),
    }
}

fn seed_rules(store: &RouteStore, path: Option<&str>) -> Result<()> {
    let rules = match path {
        Some(p) => RuleCatalogFile::from_file(Path::new(p))?.rules,
        None => demo_rules(),
    };
    for rule in &rules {
        store.insert_rule(rule)?;
    }
    Ok(())
}

fn seed_agents(store: &RouteStore, path: Option<&str>) -> Result<()> {
    let agents = match path {
        Some(p) => AgentCatalogFile::from_file(Path::new(p))?.agents,
        None => demo_agents(),
    };
    for agent in &agents {
        store.upsert_agent(&to_profile(agent))?;
    }
    Ok(())
}

fn to_profile(seed: &AgentSeed) -> routing_core::directory::AgentProfile {
    routing_core::directory::AgentProfile {
        agent_id: seed.agent_id.clone(),
        max_concurrent: seed.max_concurrent,
        current_load: 0,
        territories: seed.territories.clone(),
        skills: seed.skills.clone(),
        specializations: seed.specializations.clone(),
        available: seed.available,
        auto_assign: seed.auto_assign,
    }
}

fn demo_rules() -> Vec<RuleSeed> {
    vec![
        RuleSeed {
            id: "urgent-escalation".into(),
            name: "Urgent alerts go straight to supervisors".into(),
            priority: 100,
            enabled: true,
            conditions: vec![condition("priority", "equals", serde_json::json!("URGENT"))],
            actions: vec![action("escalate", serde_json::Value::Null)],
        },
        RuleSeed {
            id: "high-confidence-sellers".into(),
            name: "High-confidence sell intent to listing specialists".into(),
            priority: 50,
            enabled: true,
            conditions: vec![
                condition("alert_type", "equals", serde_json::json!("sell_intent")),
                condition("confidence", "greater_than", serde_json::json!(0.7)),
            ],
            actions: vec![
                action(
                    "assign_by_skill",
                    serde_json::json!({"required_skills": ["listings"]}),
                ),
                action("assign_by_territory", serde_json::Value::Null),
            ],
        },
        RuleSeed {
            id: "territory-default".into(),
            name: "Territory match for everything scored".into(),
            priority: 20,
            enabled: true,
            conditions: vec![condition("confidence", "greater_than", serde_json::json!(0.0))],
            actions: vec![action("assign_by_territory", serde_json::Value::Null)],
        },
        RuleSeed {
            id: "catch-all".into(),
            name: "Round-robin fallback".into(),
            priority: 0,
            enabled: true,
            conditions: vec![],
            actions: vec![action("assign_round_robin", serde_json::Value::Null)],
        },
    ]
}

fn demo_agents() -> Vec<AgentSeed> {
    let mut agents = Vec::new();
    for (id, territory, skills, capacity) in [
        ("agent-alpha", "SF", vec!["listings"], 5u32),
        ("agent-bravo", "SF", vec![], 4),
        ("agent-charlie", "LA", vec!["listings", "luxury"], 5),
        ("agent-delta", "NYC", vec![], 3),
        ("agent-echo", "NYC", vec!["listings"], 2),
    ] {
        agents.push(AgentSeed {
            agent_id: id.into(),
            max_concurrent: capacity,
            territories: BTreeSet::from([territory.to_string()]),
            skills: skills.into_iter().map(String::from).collect(),
            specializations: BTreeSet::new(),
            available: true,
            auto_assign: true,
        });
    }
    agents
}

fn condition(field: &str, operator: &str, value: serde_json::Value) -> RawCondition {
    RawCondition {
        field: field.into(),
        operator: operator.into(),
        value,
    }
}

fn action(action_type: &str, params: serde_json::Value) -> RawAction {
    RawAction {
        action_type: action_type.into(),
        params,
    }
}

// ── Arg parsing ──────────────────────────────────────────────────────────────

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
