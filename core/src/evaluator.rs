//! Rule evaluation: first enabled rule whose every condition holds.
//!
//! Pure functions over a rule-set snapshot and one alert context. No side
//! effects, no observable errors — an unknown field or a type mismatch makes
//! the condition false, nothing more.

use crate::{
    alert::{AlertContext, FieldValue},
    rule::{Condition, RoutingRule},
};
use serde_json::Value;
use std::cmp::Reverse;

/// Return the first enabled rule matching the context, by descending
/// priority then ascending creation order, or `None` if no rule matches.
pub fn first_match<'a>(rules: &'a [RoutingRule], ctx: &AlertContext) -> Option<&'a RoutingRule> {
    let mut ordered: Vec<&RoutingRule> = rules.iter().filter(|r| r.enabled).collect();
    ordered.sort_by_key(|r| (Reverse(r.priority), r.seq));
    ordered.into_iter().find(|r| rule_matches(r, ctx))
}

/// True when every condition of `rule` holds against `ctx`.
/// An empty condition list matches unconditionally.
pub fn rule_matches(rule: &RoutingRule, ctx: &AlertContext) -> bool {
    rule.conditions.iter().all(|c| condition_holds(c, ctx))
}

fn condition_holds(condition: &Condition, ctx: &AlertContext) -> bool {
    match condition {
        Condition::Equals { field, value } => match ctx.field(field) {
            Some(actual) => value_equals(&actual, value),
            None => false,
        },
        Condition::GreaterThan { field, value } => match ctx.field(field) {
            Some(FieldValue::Num(n)) => n > *value,
            _ => false,
        },
        Condition::LessThan { field, value } => match ctx.field(field) {
            Some(FieldValue::Num(n)) => n < *value,
            _ => false,
        },
        Condition::In { field, values } => match ctx.field(field) {
            Some(actual) => values.iter().any(|v| value_equals(&actual, v)),
            None => false,
        },
        Condition::Contains { field, needle } => match ctx.field(field) {
            Some(FieldValue::Str(s)) => s.contains(needle.as_str()),
            _ => false,
        },
    }
}

/// Strict equality between a context field and a stored JSON value.
/// Strings compare to strings, numbers to numbers; anything else is false.
fn value_equals(actual: &FieldValue, expected: &Value) -> bool {
    match (actual, expected) {
        (FieldValue::Str(s), Value::String(v)) => s == v,
        (FieldValue::Num(n), Value::Number(_)) => expected.as_f64() == Some(*n),
        _ => false,
    }
}
