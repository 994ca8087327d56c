//! Assignment and outcome records.
//!
//! Assignment rows are append-only: a reassignment marks the prior row
//! `Reassigned` and inserts a new row, preserving the audit trail. At most
//! one row per alert may be in `Assigned` state (enforced by a partial
//! unique index in the store).

use crate::types::{AgentId, AlertId, AssignmentId, RuleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    Reassigned,
    Resolved,
    Escalated,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Reassigned => "reassigned",
            Self::Resolved => "resolved",
            Self::Escalated => "escalated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assigned" => Some(Self::Assigned),
            "reassigned" => Some(Self::Reassigned),
            "resolved" => Some(Self::Resolved),
            "escalated" => Some(Self::Escalated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertAssignment {
    pub assignment_id: AssignmentId,
    pub alert_id: AlertId,
    pub agent_id: AgentId,
    /// `None` for manual assignments and reaper escalations.
    pub rule_id: Option<RuleId>,
    pub assigned_at: DateTime<Utc>,
    pub status: AssignmentStatus,
    /// JSON snapshot of the `AlertContext` that produced this assignment.
    /// Engine-internal; lets `reassign` re-route without the caller.
    pub context_json: String,
}

/// Terminal disposition of one assignment. Written once, never updated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Declined,
    TimedOut,
    Escalated,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Declined => "declined",
            Self::TimedOut => "timed_out",
            Self::Escalated => "escalated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "declined" => Some(Self::Declined),
            "timed_out" => Some(Self::TimedOut),
            "escalated" => Some(Self::Escalated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertOutcome {
    pub assignment_id: AssignmentId,
    pub outcome: OutcomeKind,
    pub recorded_at: DateTime<Utc>,
}

/// Why an alert is being routed away from its current agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReassignReason {
    Stale,
    Declined,
    Manual,
}

impl ReassignReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stale => "stale",
            Self::Declined => "declined",
            Self::Manual => "manual",
        }
    }
}
