//! Assignment statistics: observational tallies per rule and per agent.
//!
//! RULE: Purely observational. The evaluator and selector never read these
//! counters — feedback loops belong in rules, not in hidden state.

use crate::{
    assignment::OutcomeKind,
    types::{AgentId, RuleId},
};
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Why a routing call produced no assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnassignedReason {
    NoMatchingRule,
    NoEligibleAgent,
}

impl UnassignedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoMatchingRule => "no_matching_rule",
            Self::NoEligibleAgent => "no_eligible_agent",
        }
    }
}

#[derive(Default)]
pub struct StatsAggregator {
    by_rule: DashMap<(RuleId, &'static str), u64>,
    by_agent: DashMap<(AgentId, &'static str), u64>,
    unassigned: DashMap<&'static str, u64>,
}

/// A point-in-time copy of the counters. Sorted maps, so reports and test
/// assertions are deterministic.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub by_rule: BTreeMap<(RuleId, String), u64>,
    pub by_agent: BTreeMap<(AgentId, String), u64>,
    pub unassigned: BTreeMap<String, u64>,
}

impl StatsSnapshot {
    pub fn rule_count(&self, rule_id: &str, label: &str) -> u64 {
        self.by_rule
            .get(&(rule_id.to_string(), label.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn agent_count(&self, agent_id: &str, label: &str) -> u64 {
        self.by_agent
            .get(&(agent_id.to_string(), label.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn unassigned_count(&self, reason: UnassignedReason) -> u64 {
        self.unassigned
            .get(reason.as_str())
            .copied()
            .unwrap_or(0)
    }
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally a recorded outcome against the rule and agent that produced
    /// the assignment. Manual assignments have no rule key.
    pub fn record_outcome(
        &self,
        rule_id: Option<&str>,
        agent_id: &str,
        outcome: OutcomeKind,
    ) {
        let label = outcome.as_str();
        if let Some(rule_id) = rule_id {
            *self
                .by_rule
                .entry((rule_id.to_string(), label))
                .or_insert(0) += 1;
        }
        *self
            .by_agent
            .entry((agent_id.to_string(), label))
            .or_insert(0) += 1;
    }

    /// Tally an unassigned fallback. `rule_id` is present when a rule
    /// matched but no agent was eligible.
    pub fn record_unassigned(&self, rule_id: Option<&str>, reason: UnassignedReason) {
        *self.unassigned.entry(reason.as_str()).or_insert(0) += 1;
        if let Some(rule_id) = rule_id {
            *self
                .by_rule
                .entry((rule_id.to_string(), reason.as_str()))
                .or_insert(0) += 1;
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            by_rule: self
                .by_rule
                .iter()
                .map(|e| ((e.key().0.clone(), e.key().1.to_string()), *e.value()))
                .collect(),
            by_agent: self
                .by_agent
                .iter()
                .map(|e| ((e.key().0.clone(), e.key().1.to_string()), *e.value()))
                .collect(),
            unassigned: self
                .unassigned
                .iter()
                .map(|e| (e.key().to_string(), *e.value()))
                .collect(),
        }
    }
}
