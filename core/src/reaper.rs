//! The stale-work reaper.
//!
//! Scans assignments stuck in ASSIGNED past an age threshold with no
//! recorded outcome and re-routes each one. The scheduler that triggers the
//! sweep lives outside the engine; the whole contract here is
//! `handle_stale(max_age_days)`.
//!
//! Idempotent by construction: each candidate's status is re-checked
//! immediately before acting, so a second sweep over the same data (or a
//! sweep re-run after an interruption) skips alerts the first pass already
//! moved. Per-alert failures never abort the batch.

use crate::{
    alert::AlertContext,
    assignment::ReassignReason,
    engine::{RouteOutcome, RoutingEngine},
    error::RoutingResult,
    event::RouteEvent,
    types::{AgentId, AlertId},
};

/// Per-alert result of one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleResult {
    pub alert_id: AlertId,
    pub disposition: StaleDisposition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleDisposition {
    /// Re-routed to a new agent.
    Reassigned { agent_id: AgentId },
    /// No eligible agent (or the rule escalated); handed to the
    /// supervisory queue.
    Escalated,
    /// Already moved out of ASSIGNED by the time this sweep reached it.
    Skipped,
    /// A store fault for this one alert; the batch continued.
    Failed { detail: String },
}

pub struct StaleWorkReaper<'a> {
    engine: &'a RoutingEngine,
}

impl<'a> StaleWorkReaper<'a> {
    pub fn new(engine: &'a RoutingEngine) -> Self {
        Self { engine }
    }

    pub fn handle_stale(&self, max_age_days: i64) -> RoutingResult<Vec<StaleResult>> {
        let candidates = self.engine.store().list_stale(max_age_days)?;
        let scanned = candidates.len() as u64;
        let mut results = Vec::with_capacity(candidates.len());
        let (mut reassigned, mut escalated, mut skipped, mut failed) = (0u64, 0u64, 0u64, 0u64);

        for candidate in candidates {
            let disposition = match self.reap_one(&candidate.alert_id, &candidate.assignment_id) {
                Ok(d) => d,
                Err(e) => {
                    log::error!(
                        "stale sweep failed for alert '{}': {e}",
                        candidate.alert_id
                    );
                    StaleDisposition::Failed { detail: e.to_string() }
                }
            };
            match &disposition {
                StaleDisposition::Reassigned { .. } => reassigned += 1,
                StaleDisposition::Escalated => escalated += 1,
                StaleDisposition::Skipped => skipped += 1,
                StaleDisposition::Failed { .. } => failed += 1,
            }
            results.push(StaleResult {
                alert_id: candidate.alert_id,
                disposition,
            });
        }

        self.engine.append(&RouteEvent::StaleSweepCompleted {
            scanned,
            reassigned,
            escalated,
            skipped,
            failed,
        })?;
        log::info!(
            "stale sweep: scanned {scanned}, reassigned {reassigned}, \
             escalated {escalated}, skipped {skipped}, failed {failed}"
        );
        Ok(results)
    }

    fn reap_one(
        &self,
        alert_id: &str,
        expected_assignment: &str,
    ) -> RoutingResult<StaleDisposition> {
        // Idempotence guard: confirm the row is still the active one right
        // before acting. A prior sweep (or a resolve racing this one) may
        // already have moved it.
        let still_active = match self.engine.store().get_active_assignment(alert_id)? {
            Some(active) if active.assignment_id == expected_assignment => active,
            _ => return Ok(StaleDisposition::Skipped),
        };

        match self.engine.reassign(alert_id, ReassignReason::Stale)? {
            RouteOutcome::Assigned { agent_id, .. } => {
                Ok(StaleDisposition::Reassigned { agent_id })
            }
            RouteOutcome::Escalated { .. } => Ok(StaleDisposition::Escalated),
            RouteOutcome::Unassigned { .. } => {
                // Nobody can take it; park it with the supervisory queue
                // rather than leaving it silently unowned.
                let ctx: AlertContext = serde_json::from_str(&still_active.context_json)?;
                self.engine.persist_escalation(&ctx, None)?;
                Ok(StaleDisposition::Escalated)
            }
        }
    }
}
