//! The assignment coordinator — the engine's public trigger surface.
//!
//! Per-alert state machine:
//!   UNROUTED → ASSIGNED → { RESOLVED | REASSIGNED → ASSIGNED | ESCALATED }
//!
//! RULES:
//!   - No-match and no-agent are routing OUTCOMES, returned as values.
//!     `Err` is reserved for store faults and consistency violations.
//!   - Every state change lands in the audit event log.
//!   - Capacity moves only through the directory's atomic operations.

use crate::{
    alert::AlertContext,
    assignment::{
        AlertAssignment, AlertOutcome, AssignmentStatus, OutcomeKind, ReassignReason,
    },
    config::RoutingConfig,
    directory::AgentDirectory,
    error::{RoutingError, RoutingResult},
    evaluator,
    event::{event_type_name, RouteEvent},
    selector::{CandidateSelector, Selection},
    stats::{StatsAggregator, UnassignedReason},
    store::RouteStore,
    types::{AgentId, AssignmentId, RuleId},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Caller-visible result of one routing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Assigned {
        agent_id: AgentId,
        rule_id: RuleId,
        assignment_id: AssignmentId,
    },
    /// The matched rule escalated to the supervisory queue.
    Escalated {
        rule_id: Option<RuleId>,
        assignment_id: AssignmentId,
    },
    /// No rule matched, or a rule matched but no agent was eligible.
    /// A normal outcome, not an error.
    Unassigned { reason: UnassignedReason },
}

pub struct RoutingEngine {
    store: Arc<RouteStore>,
    directory: AgentDirectory,
    stats: StatsAggregator,
    config: RoutingConfig,
}

impl RoutingEngine {
    pub fn new(store: Arc<RouteStore>, config: RoutingConfig) -> Self {
        Self {
            directory: AgentDirectory::new(Arc::clone(&store)),
            stats: StatsAggregator::new(),
            store,
            config,
        }
    }

    pub fn store(&self) -> &RouteStore {
        &self.store
    }

    pub fn directory(&self) -> &AgentDirectory {
        &self.directory
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Route one alert: evaluate rules, select and reserve an agent, and
    /// persist the assignment.
    pub fn route(&self, ctx: &AlertContext) -> RoutingResult<RouteOutcome> {
        self.route_excluding(ctx, None)
    }

    fn route_excluding(
        &self,
        ctx: &AlertContext,
        exclude: Option<&str>,
    ) -> RoutingResult<RouteOutcome> {
        let rules = self.store.list_enabled_rules()?;
        let rule = match evaluator::first_match(&rules, ctx) {
            Some(rule) => rule,
            None => {
                log::debug!("alert '{}': no enabled rule matched", ctx.alert_id);
                self.stats
                    .record_unassigned(None, UnassignedReason::NoMatchingRule);
                self.append(&RouteEvent::AlertUnassigned {
                    alert_id: ctx.alert_id.clone(),
                    reason: UnassignedReason::NoMatchingRule.as_str().to_string(),
                    rule_id: None,
                })?;
                return Ok(RouteOutcome::Unassigned {
                    reason: UnassignedReason::NoMatchingRule,
                });
            }
        };

        let selector = CandidateSelector::new(&self.directory, self.config.max_reserve_attempts);

        // Actions are tried in order; the first one that yields an
        // assignment (or escalation) wins.
        for action in &rule.actions {
            match selector.select(&rule.id, action, ctx, exclude)? {
                Selection::Reserved { agent_id } => {
                    return self.persist_assignment(ctx, &rule.id, agent_id);
                }
                Selection::Escalate => {
                    let assignment_id = self.persist_escalation(ctx, Some(&rule.id))?;
                    return Ok(RouteOutcome::Escalated {
                        rule_id: Some(rule.id.clone()),
                        assignment_id,
                    });
                }
                Selection::NoEligibleAgent { .. } => continue,
            }
        }

        log::debug!(
            "alert '{}': rule '{}' matched but no agent was eligible",
            ctx.alert_id,
            rule.id
        );
        self.stats
            .record_unassigned(Some(&rule.id), UnassignedReason::NoEligibleAgent);
        self.append(&RouteEvent::AlertUnassigned {
            alert_id: ctx.alert_id.clone(),
            reason: UnassignedReason::NoEligibleAgent.as_str().to_string(),
            rule_id: Some(rule.id.clone()),
        })?;
        Ok(RouteOutcome::Unassigned {
            reason: UnassignedReason::NoEligibleAgent,
        })
    }

    /// Transition the alert's active assignment to RESOLVED, record the
    /// outcome, and free the agent's capacity.
    pub fn resolve(&self, alert_id: &str, outcome: OutcomeKind) -> RoutingResult<()> {
        let active = self
            .store
            .get_active_assignment(alert_id)?
            .ok_or_else(|| RoutingError::NoActiveAssignment {
                alert_id: alert_id.to_string(),
            })?;

        self.store
            .mark_assignment_status(&active.assignment_id, AssignmentStatus::Resolved)?;
        self.store.record_outcome(&AlertOutcome {
            assignment_id: active.assignment_id.clone(),
            outcome,
            recorded_at: Utc::now(),
        })?;
        self.directory.release(&active.agent_id)?;
        self.stats
            .record_outcome(active.rule_id.as_deref(), &active.agent_id, outcome);
        self.append(&RouteEvent::AlertResolved {
            alert_id: alert_id.to_string(),
            agent_id: active.agent_id.clone(),
            assignment_id: active.assignment_id,
            outcome: outcome.as_str().to_string(),
        })?;
        Ok(())
    }

    /// Mark the active assignment superseded, free the prior agent, and
    /// re-route the stored context — excluding the prior agent for this
    /// call only.
    pub fn reassign(
        &self,
        alert_id: &str,
        reason: ReassignReason,
    ) -> RoutingResult<RouteOutcome> {
        let active = self
            .store
            .get_active_assignment(alert_id)?
            .ok_or_else(|| RoutingError::NoActiveAssignment {
                alert_id: alert_id.to_string(),
            })?;
        let ctx: AlertContext = serde_json::from_str(&active.context_json)?;

        self.store
            .mark_assignment_status(&active.assignment_id, AssignmentStatus::Reassigned)?;
        self.directory.release(&active.agent_id)?;
        self.append(&RouteEvent::AlertReassigned {
            alert_id: alert_id.to_string(),
            from_agent: active.agent_id.clone(),
            reason: reason.as_str().to_string(),
            superseded_assignment: active.assignment_id.clone(),
        })?;

        self.route_excluding(&ctx, Some(&active.agent_id))
    }

    /// Sweep assignments left in ASSIGNED longer than `max_age_days` and
    /// re-route or escalate each one. See `reaper` for the batch contract.
    pub fn handle_stale(
        &self,
        max_age_days: i64,
    ) -> RoutingResult<Vec<crate::reaper::StaleResult>> {
        crate::reaper::StaleWorkReaper::new(self).handle_stale(max_age_days)
    }

    // ── Persistence steps ────────────────────────────────────────────────────

    fn persist_assignment(
        &self,
        ctx: &AlertContext,
        rule_id: &str,
        agent_id: AgentId,
    ) -> RoutingResult<RouteOutcome> {
        let assignment = AlertAssignment {
            assignment_id: Uuid::new_v4().to_string(),
            alert_id: ctx.alert_id.clone(),
            agent_id: agent_id.clone(),
            rule_id: Some(rule_id.to_string()),
            assigned_at: Utc::now(),
            status: AssignmentStatus::Assigned,
            context_json: serde_json::to_string(ctx)?,
        };

        if let Err(e) = self.store.insert_assignment(&assignment) {
            // The reservation already happened; give the capacity back
            // before surfacing the fault.
            log::error!(
                "failed to persist assignment for alert '{}': {e}",
                ctx.alert_id
            );
            self.directory.release(&agent_id)?;
            return Err(e);
        }

        self.append(&RouteEvent::AlertAssigned {
            alert_id: ctx.alert_id.clone(),
            agent_id: agent_id.clone(),
            rule_id: assignment.rule_id.clone(),
            assignment_id: assignment.assignment_id.clone(),
        })?;
        log::info!(
            "alert '{}' assigned to agent '{agent_id}' by rule '{rule_id}'",
            ctx.alert_id
        );
        Ok(RouteOutcome::Assigned {
            agent_id,
            rule_id: rule_id.to_string(),
            assignment_id: assignment.assignment_id,
        })
    }

    /// Record an escalated assignment against the supervisory queue. The
    /// queue is outside the engine, so the assignment is terminal from the
    /// engine's perspective: its ESCALATED outcome is recorded immediately.
    pub(crate) fn persist_escalation(
        &self,
        ctx: &AlertContext,
        rule_id: Option<&str>,
    ) -> RoutingResult<AssignmentId> {
        let assignment = AlertAssignment {
            assignment_id: Uuid::new_v4().to_string(),
            alert_id: ctx.alert_id.clone(),
            agent_id: self.config.escalation_queue.clone(),
            rule_id: rule_id.map(String::from),
            assigned_at: Utc::now(),
            status: AssignmentStatus::Escalated,
            context_json: serde_json::to_string(ctx)?,
        };
        self.store.insert_assignment(&assignment)?;
        self.store.record_outcome(&AlertOutcome {
            assignment_id: assignment.assignment_id.clone(),
            outcome: OutcomeKind::Escalated,
            recorded_at: Utc::now(),
        })?;
        self.stats.record_outcome(
            rule_id,
            &self.config.escalation_queue,
            OutcomeKind::Escalated,
        );
        self.append(&RouteEvent::AlertEscalated {
            alert_id: ctx.alert_id.clone(),
            queue: self.config.escalation_queue.clone(),
            rule_id: rule_id.map(String::from),
            assignment_id: assignment.assignment_id.clone(),
        })?;
        log::info!(
            "alert '{}' escalated to queue '{}'",
            ctx.alert_id,
            self.config.escalation_queue
        );
        Ok(assignment.assignment_id)
    }

    pub(crate) fn append(&self, event: &RouteEvent) -> RoutingResult<()> {
        self.store
            .append_event(event_type_name(event), &serde_json::to_string(event)?)
    }
}
