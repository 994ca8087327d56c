//! The agent directory: profile snapshots and capacity accounting.
//!
//! The only contended shared resource in the engine is each agent's
//! `current_load` counter. All mutations to it go through `try_reserve` /
//! `release`, each a single conditional UPDATE, so two concurrent routing
//! calls can never jointly push an agent past `max_concurrent`. Bulk
//! snapshots may be momentarily stale; the selector compensates with its
//! bounded retry loop.
//!
//! Round-robin cursors live here too, scoped per rule. They are in-memory
//! and re-derivable: a process restart restarts the rotation.

use crate::{
    error::RoutingResult,
    store::RouteStore,
    types::{AgentId, RuleId},
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A worker with finite concurrent capacity, skills, and territories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: AgentId,
    pub max_concurrent: u32,
    /// Active assignment count. Hard invariant: `<= max_concurrent`,
    /// enforced by the conditional reservation UPDATE.
    pub current_load: u32,
    pub territories: BTreeSet<String>,
    pub skills: BTreeSet<String>,
    pub specializations: BTreeSet<String>,
    pub available: bool,
    pub auto_assign: bool,
}

impl AgentProfile {
    pub fn has_capacity(&self) -> bool {
        self.current_load < self.max_concurrent
    }
}

pub struct AgentDirectory {
    store: Arc<RouteStore>,
    /// Round-robin position per rule. Advances only on successful reservation.
    cursors: DashMap<RuleId, u64>,
}

impl AgentDirectory {
    pub fn new(store: Arc<RouteStore>) -> Self {
        Self {
            store,
            cursors: DashMap::new(),
        }
    }

    /// Snapshot of every agent that could take work right now: available,
    /// opted into auto-assignment, and under capacity. Eventually consistent
    /// — the load values may be stale by the time the caller reserves.
    pub fn auto_assignable(&self) -> RoutingResult<Vec<AgentProfile>> {
        self.store.list_auto_assignable()
    }

    pub fn get(&self, agent_id: &str) -> RoutingResult<AgentProfile> {
        self.store.get_agent(agent_id)
    }

    /// Atomically test-and-increment the agent's load. Returns false when
    /// the agent is full, unavailable, or gone — the caller re-snapshots
    /// and retries.
    pub fn try_reserve(&self, agent_id: &str) -> RoutingResult<bool> {
        self.store.try_reserve(agent_id)
    }

    /// Atomically decrement the agent's load, floored at zero. A decrement
    /// that would go negative is a consistency violation: it is logged at
    /// error level and mirrored into the audit event log, never silently
    /// clamped without alarm.
    pub fn release(&self, agent_id: &str) -> RoutingResult<()> {
        let released = self.store.release_capacity(agent_id)?;
        if !released {
            let detail = format!("release for agent '{agent_id}' would drive load below zero");
            log::error!("consistency violation: {detail}");
            self.store.append_capacity_anomaly(agent_id, &detail)?;
        }
        Ok(())
    }

    /// Current round-robin position for a rule. Missing entries start at 0.
    pub fn cursor(&self, rule_id: &str) -> u64 {
        self.cursors.get(rule_id).map(|c| *c).unwrap_or(0)
    }

    /// Advance the rule's cursor past the slot that was just assigned.
    pub fn advance_cursor(&self, rule_id: &str, assigned_slot: u64) {
        self.cursors.insert(rule_id.to_string(), assigned_slot + 1);
    }
}
