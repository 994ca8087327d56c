//! Candidate selection: hard eligibility filters, per-action selection
//! policy, and the bounded reserve-retry loop.
//!
//! The critical section "snapshot eligible agents → pick one → atomically
//! bump its load" is retried, not blocked: when the reservation UPDATE loses
//! a race, the selector re-snapshots and tries again, up to the configured
//! budget, before declaring no eligible agent.

use crate::{
    alert::AlertContext,
    directory::{AgentDirectory, AgentProfile},
    error::RoutingResult,
    rule::Action,
    types::AgentId,
};

/// What selection produced for one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// An agent was picked and its capacity reserved.
    Reserved { agent_id: AgentId },
    /// The action routes to the supervisory queue, not a normal agent.
    Escalate,
    /// No agent satisfied the filters (or the retry budget ran out —
    /// `capacity_race` distinguishes the two for tuning).
    NoEligibleAgent { capacity_race: bool },
}

pub struct CandidateSelector<'a> {
    directory: &'a AgentDirectory,
    max_reserve_attempts: u32,
}

impl<'a> CandidateSelector<'a> {
    pub fn new(directory: &'a AgentDirectory, max_reserve_attempts: u32) -> Self {
        Self {
            directory,
            // A zero budget would never reserve anything.
            max_reserve_attempts: max_reserve_attempts.max(1),
        }
    }

    /// Pick exactly one agent for `action` and reserve its capacity, or
    /// report escalation / no eligible agent.
    ///
    /// `exclude` drops one agent from eligibility for this call only —
    /// `reassign` uses it so an alert never thrashes straight back to the
    /// agent that just shed it.
    pub fn select(
        &self,
        rule_id: &str,
        action: &Action,
        ctx: &AlertContext,
        exclude: Option<&str>,
    ) -> RoutingResult<Selection> {
        if matches!(action, Action::Escalate) {
            return Ok(Selection::Escalate);
        }

        for attempt in 0..self.max_reserve_attempts {
            let eligible = self.eligible_agents(action, ctx, exclude)?;
            if eligible.is_empty() {
                // An empty set after a lost race means the capacity we saw
                // was taken out from under us.
                return Ok(Selection::NoEligibleAgent {
                    capacity_race: attempt > 0,
                });
            }

            let (agent_id, rr_slot) = match action {
                Action::AssignRoundRobin => {
                    let slot = self.directory.cursor(rule_id) % eligible.len() as u64;
                    (eligible[slot as usize].agent_id.clone(), Some(slot))
                }
                _ => match least_loaded(&eligible) {
                    Some(agent) => (agent.agent_id.clone(), None),
                    None => continue, // unreachable: eligible is non-empty here
                },
            };

            if self.directory.try_reserve(&agent_id)? {
                if let Some(slot) = rr_slot {
                    self.directory.advance_cursor(rule_id, slot);
                }
                return Ok(Selection::Reserved { agent_id });
            }
            // Lost the race between snapshot and reserve; go around.
            log::debug!(
                "reservation for agent '{agent_id}' lost a capacity race \
                 (attempt {} of {})",
                attempt + 1,
                self.max_reserve_attempts
            );
        }

        log::warn!(
            "capacity race retry budget ({}) exhausted for rule '{rule_id}', \
             alert '{}'",
            self.max_reserve_attempts,
            ctx.alert_id
        );
        Ok(Selection::NoEligibleAgent { capacity_race: true })
    }

    /// Apply the hard filters in order. The directory snapshot already
    /// excludes unavailable, opted-out, and full agents.
    fn eligible_agents(
        &self,
        action: &Action,
        ctx: &AlertContext,
        exclude: Option<&str>,
    ) -> RoutingResult<Vec<AgentProfile>> {
        let snapshot = self.directory.auto_assignable()?;
        Ok(snapshot
            .into_iter()
            .filter(|agent| exclude != Some(agent.agent_id.as_str()))
            .filter(|agent| action_filters(action, ctx, agent))
            .collect())
    }
}

fn action_filters(action: &Action, ctx: &AlertContext, agent: &AgentProfile) -> bool {
    match action {
        Action::AssignBySkill { required_skills } => required_skills
            .iter()
            .all(|skill| agent.skills.contains(skill)),
        Action::AssignByTerritory => match &ctx.territory {
            // Absent territory on either side skips the filter.
            Some(territory) if !agent.territories.is_empty() => {
                agent.territories.contains(territory)
            }
            _ => true,
        },
        Action::AssignRoundRobin => true,
        Action::Escalate => false, // never reaches agent filtering
    }
}

/// Lowest current load, ties broken by lexicographically smallest agent id.
/// The snapshot arrives id-sorted, so a plain min_by_key is stable.
fn least_loaded(eligible: &[AgentProfile]) -> Option<&AgentProfile> {
    eligible
        .iter()
        .min_by_key(|agent| (agent.current_load, agent.agent_id.clone()))
}
