//! The audit event log.
//!
//! RULE: Every state change the engine makes is recorded here, append-only.
//! Soft-disabled rules and superseded assignments stay queryable, and
//! consistency anomalies are never silently corrected — they land in this
//! log next to the error-level log line.

use crate::types::{AgentId, AlertId, AssignmentId, RuleId};
use serde::{Deserialize, Serialize};

/// Every event emitted by the engine.
/// Variants are added over time — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteEvent {
    AlertAssigned {
        alert_id: AlertId,
        agent_id: AgentId,
        rule_id: Option<RuleId>,
        assignment_id: AssignmentId,
    },
    AlertUnassigned {
        alert_id: AlertId,
        reason: String, // "no_matching_rule" | "no_eligible_agent"
        rule_id: Option<RuleId>,
    },
    AlertEscalated {
        alert_id: AlertId,
        queue: String,
        rule_id: Option<RuleId>,
        assignment_id: AssignmentId,
    },
    AlertResolved {
        alert_id: AlertId,
        agent_id: AgentId,
        assignment_id: AssignmentId,
        outcome: String,
    },
    AlertReassigned {
        alert_id: AlertId,
        from_agent: AgentId,
        reason: String,
        superseded_assignment: AssignmentId,
    },
    StaleSweepCompleted {
        scanned: u64,
        reassigned: u64,
        escalated: u64,
        skipped: u64,
        failed: u64,
    },
    CapacityAnomaly {
        agent_id: AgentId,
        detail: String,
    },
}

/// Extract a stable string name from a RouteEvent variant.
/// Used for the event_type column in route_event.
pub fn event_type_name(event: &RouteEvent) -> &'static str {
    match event {
        RouteEvent::AlertAssigned { .. } => "alert_assigned",
        RouteEvent::AlertUnassigned { .. } => "alert_unassigned",
        RouteEvent::AlertEscalated { .. } => "alert_escalated",
        RouteEvent::AlertResolved { .. } => "alert_resolved",
        RouteEvent::AlertReassigned { .. } => "alert_reassigned",
        RouteEvent::StaleSweepCompleted { .. } => "stale_sweep_completed",
        RouteEvent::CapacityAnomaly { .. } => "capacity_anomaly",
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEventEntry {
    pub id: Option<i64>,
    pub event_type: String,
    pub payload: String, // JSON-serialized RouteEvent
    pub recorded_at: String,
}
