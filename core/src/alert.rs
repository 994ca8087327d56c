//! Alert input types.
//!
//! An `AlertContext` is supplied by the caller per routing request. The
//! engine never stores it as an entity of its own, but each assignment row
//! carries a JSON snapshot of it so `reassign` and the stale-work reaper can
//! re-route without a collaborator round trip.

use crate::types::AlertId;
use serde::{Deserialize, Serialize};

/// Urgency of an alert, set upstream by the scoring pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl AlertPriority {
    /// The canonical name used for rule-condition matching.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

/// The routing input for a single alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertContext {
    pub alert_id: AlertId,
    pub user_id: String,
    pub alert_type: String,
    /// Upstream model confidence, 0.0–1.0.
    pub confidence: f64,
    pub priority: AlertPriority,
    pub territory: Option<String>,
}

/// A context field as seen by condition evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Num(f64),
}

impl AlertContext {
    /// Resolve a condition field by name.
    ///
    /// Unknown fields resolve to `None` — the condition then evaluates
    /// false, never an error. `priority` resolves to its canonical name, so
    /// it participates in equals/in/contains but not numeric comparison.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "alert_id" | "alertId" => Some(FieldValue::Str(self.alert_id.clone())),
            "user_id" | "userId" => Some(FieldValue::Str(self.user_id.clone())),
            "alert_type" | "alertType" => Some(FieldValue::Str(self.alert_type.clone())),
            "confidence" => Some(FieldValue::Num(self.confidence)),
            "priority" => Some(FieldValue::Str(self.priority.as_str().to_string())),
            "territory" => self.territory.clone().map(FieldValue::Str),
            _ => None,
        }
    }
}
