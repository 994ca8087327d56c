//! Outcome persistence. One terminal outcome per assignment, immutable.

use super::{format_ts, parse_ts, RouteStore};
use crate::{
    assignment::{AlertOutcome, OutcomeKind},
    error::{RoutingError, RoutingResult},
};
use rusqlite::{params, ErrorCode, OptionalExtension};

impl RouteStore {
    pub fn record_outcome(&self, outcome: &AlertOutcome) -> RoutingResult<()> {
        let result = self.conn.lock().execute(
            "INSERT INTO alert_outcome (assignment_id, outcome, recorded_at)
             VALUES (?1, ?2, ?3)",
            params![
                outcome.assignment_id,
                outcome.outcome.as_str(),
                format_ts(outcome.recorded_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(RoutingError::ConsistencyViolation {
                    detail: format!(
                        "assignment '{}' already has a recorded outcome",
                        outcome.assignment_id
                    ),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_outcome(&self, assignment_id: &str) -> RoutingResult<Option<AlertOutcome>> {
        let raw = self
            .conn
            .lock()
            .query_row(
                "SELECT assignment_id, outcome, recorded_at
                 FROM alert_outcome WHERE assignment_id = ?1",
                params![assignment_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        match raw {
            Some((assignment_id, outcome_raw, recorded_raw)) => {
                let outcome = OutcomeKind::parse(&outcome_raw).ok_or_else(|| {
                    RoutingError::ConsistencyViolation {
                        detail: format!("unknown stored outcome '{outcome_raw}'"),
                    }
                })?;
                Ok(Some(AlertOutcome {
                    assignment_id,
                    outcome,
                    recorded_at: parse_ts(&recorded_raw)?,
                }))
            }
            None => Ok(None),
        }
    }

    // ── Outcome test helpers ─────────────────────────────────────────────────

    pub fn outcome_count(&self) -> RoutingResult<i64> {
        Ok(self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM alert_outcome", [], |r| r.get(0))?)
    }
}
