//! Shared primitive types used across the entire engine.

/// Stable identifier of an alert (assigned upstream, opaque here).
pub type AlertId = String;

/// Stable identifier of an agent in the directory.
pub type AgentId = String;

/// Stable identifier of a routing rule.
pub type RuleId = String;

/// Unique identifier of one assignment row (uuid v4).
pub type AssignmentId = String;
