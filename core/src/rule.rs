//! Routing rules: prioritized condition → action mappings.
//!
//! Conditions and actions are stored as JSON parameter bags but resolved
//! into closed tagged variants when rules are loaded, so a malformed rule is
//! caught at load time (it degrades to "never matches" and is logged), not
//! discovered mid-evaluation.

use crate::types::RuleId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A condition resolved from its stored `{field, operator, value}` bag.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Strict value equality (string or numeric).
    Equals { field: String, value: Value },
    /// Numeric comparison. A non-numeric context field evaluates false.
    GreaterThan { field: String, value: f64 },
    LessThan { field: String, value: f64 },
    /// Membership in a supplied list.
    In { field: String, values: Vec<Value> },
    /// Substring match on string fields.
    Contains { field: String, needle: String },
}

/// An action resolved from its stored `{type, params}` bag.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AssignBySkill { required_skills: Vec<String> },
    AssignRoundRobin,
    AssignByTerritory,
    Escalate,
}

/// A fully resolved, evaluable routing rule.
#[derive(Debug, Clone)]
pub struct RoutingRule {
    pub id: RuleId,
    pub name: String,
    /// Higher priority evaluates first. Ties break by creation order.
    pub priority: i64,
    pub enabled: bool,
    /// Creation order (store rowid). Lower is earlier.
    pub seq: i64,
    /// All conditions must hold for the rule to match.
    /// An empty list matches unconditionally (catch-all rules).
    pub conditions: Vec<Condition>,
    /// Tried in order until one yields an assignment.
    pub actions: Vec<Action>,
}

// ── Stored parameter bags ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCondition {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SkillParams {
    #[serde(default, alias = "requiredSkills")]
    required_skills: Vec<String>,
}

impl Condition {
    /// Resolve a stored condition bag. `Err` carries a human-readable
    /// reason; the caller logs it and drops the whole rule.
    pub fn from_raw(raw: &RawCondition) -> Result<Self, String> {
        let field = raw.field.clone();
        match raw.operator.as_str() {
            "equals" => Ok(Condition::Equals { field, value: raw.value.clone() }),
            "greater_than" => match raw.value.as_f64() {
                Some(v) => Ok(Condition::GreaterThan { field, value: v }),
                None => Err(format!("greater_than needs a numeric value, got {}", raw.value)),
            },
            "less_than" => match raw.value.as_f64() {
                Some(v) => Ok(Condition::LessThan { field, value: v }),
                None => Err(format!("less_than needs a numeric value, got {}", raw.value)),
            },
            "in" => match raw.value.as_array() {
                Some(list) => Ok(Condition::In { field, values: list.clone() }),
                None => Err(format!("in needs a list value, got {}", raw.value)),
            },
            "contains" => match raw.value.as_str() {
                Some(s) => Ok(Condition::Contains { field, needle: s.to_string() }),
                None => Err(format!("contains needs a string value, got {}", raw.value)),
            },
            other => Err(format!("unknown operator '{other}'")),
        }
    }
}

impl Action {
    pub fn from_raw(raw: &RawAction) -> Result<Self, String> {
        match raw.action_type.as_str() {
            "assign_by_skill" => {
                let params: SkillParams = if raw.params.is_null() {
                    SkillParams::default()
                } else {
                    serde_json::from_value(raw.params.clone())
                        .map_err(|e| format!("bad assign_by_skill params: {e}"))?
                };
                Ok(Action::AssignBySkill { required_skills: params.required_skills })
            }
            "assign_round_robin" => Ok(Action::AssignRoundRobin),
            "assign_by_territory" => Ok(Action::AssignByTerritory),
            "escalate" => Ok(Action::Escalate),
            other => Err(format!("unknown action type '{other}'")),
        }
    }
}

impl RoutingRule {
    /// Resolve the stored JSON columns of a rule row.
    ///
    /// Any malformed condition or action poisons the whole rule: the rule
    /// must never half-match, so the caller excludes it from evaluation.
    pub fn resolve(
        id: RuleId,
        name: String,
        priority: i64,
        enabled: bool,
        seq: i64,
        conditions_json: &str,
        actions_json: &str,
    ) -> Result<Self, String> {
        let raw_conditions: Vec<RawCondition> = serde_json::from_str(conditions_json)
            .map_err(|e| format!("conditions are not valid JSON: {e}"))?;
        let raw_actions: Vec<RawAction> = serde_json::from_str(actions_json)
            .map_err(|e| format!("actions are not valid JSON: {e}"))?;

        let conditions = raw_conditions
            .iter()
            .map(Condition::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        let actions = raw_actions
            .iter()
            .map(Action::from_raw)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { id, name, priority, enabled, seq, conditions, actions })
    }
}
