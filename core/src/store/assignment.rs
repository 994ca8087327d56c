//! Assignment persistence: append-only rows, one active per alert.

use super::{format_ts, parse_ts, RouteStore};
use crate::{
    assignment::{AlertAssignment, AssignmentStatus},
    error::{RoutingError, RoutingResult},
};
use chrono::{Duration, Utc};
use rusqlite::{params, ErrorCode, OptionalExtension};

const ASSIGNMENT_COLUMNS: &str =
    "assignment_id, alert_id, agent_id, rule_id, assigned_at, status, context_json";

/// Raw row before timestamp/status decoding.
struct AssignmentRow {
    assignment_id: String,
    alert_id: String,
    agent_id: String,
    rule_id: Option<String>,
    assigned_at: String,
    status: String,
    context_json: String,
}

fn row_to_assignment(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssignmentRow> {
    Ok(AssignmentRow {
        assignment_id: row.get(0)?,
        alert_id: row.get(1)?,
        agent_id: row.get(2)?,
        rule_id: row.get(3)?,
        assigned_at: row.get(4)?,
        status: row.get(5)?,
        context_json: row.get(6)?,
    })
}

fn finish_assignment(row: AssignmentRow) -> RoutingResult<AlertAssignment> {
    let status = AssignmentStatus::parse(&row.status).ok_or_else(|| {
        RoutingError::ConsistencyViolation {
            detail: format!("unknown stored assignment status '{}'", row.status),
        }
    })?;
    Ok(AlertAssignment {
        assignment_id: row.assignment_id,
        alert_id: row.alert_id,
        agent_id: row.agent_id,
        rule_id: row.rule_id,
        assigned_at: parse_ts(&row.assigned_at)?,
        status,
        context_json: row.context_json,
    })
}

impl RouteStore {
    /// Insert a new assignment row. The partial unique index rejects a
    /// second active row for the same alert; that rejection surfaces as a
    /// `ConsistencyViolation`, never as a silent overwrite.
    pub fn insert_assignment(&self, assignment: &AlertAssignment) -> RoutingResult<()> {
        let result = self.conn.lock().execute(
            "INSERT INTO assignment (assignment_id, alert_id, agent_id, rule_id,
                assigned_at, status, context_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                assignment.assignment_id,
                assignment.alert_id,
                assignment.agent_id,
                assignment.rule_id,
                format_ts(assignment.assigned_at),
                assignment.status.as_str(),
                assignment.context_json,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(RoutingError::ConsistencyViolation {
                    detail: format!(
                        "alert '{}' already has an active assignment",
                        assignment.alert_id
                    ),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_active_assignment(&self, alert_id: &str) -> RoutingResult<Option<AlertAssignment>> {
        let raw = self
            .conn
            .lock()
            .query_row(
                &format!(
                    "SELECT {ASSIGNMENT_COLUMNS} FROM assignment
                     WHERE alert_id = ?1 AND status = 'assigned'"
                ),
                params![alert_id],
                row_to_assignment,
            )
            .optional()?;
        raw.map(finish_assignment).transpose()
    }

    pub fn get_assignment(&self, assignment_id: &str) -> RoutingResult<Option<AlertAssignment>> {
        let raw = self
            .conn
            .lock()
            .query_row(
                &format!(
                    "SELECT {ASSIGNMENT_COLUMNS} FROM assignment
                     WHERE assignment_id = ?1"
                ),
                params![assignment_id],
                row_to_assignment,
            )
            .optional()?;
        raw.map(finish_assignment).transpose()
    }

    pub fn mark_assignment_status(
        &self,
        assignment_id: &str,
        status: AssignmentStatus,
    ) -> RoutingResult<()> {
        let changed = self.conn.lock().execute(
            "UPDATE assignment SET status = ?1 WHERE assignment_id = ?2",
            params![status.as_str(), assignment_id],
        )?;
        if changed == 0 {
            return Err(RoutingError::ConsistencyViolation {
                detail: format!("assignment '{assignment_id}' vanished during status update"),
            });
        }
        Ok(())
    }

    /// Active assignments older than `max_age_days` with no recorded
    /// outcome, oldest first. The reaper's scan query.
    pub fn list_stale(&self, max_age_days: i64) -> RoutingResult<Vec<AlertAssignment>> {
        let cutoff = format_ts(Utc::now() - Duration::days(max_age_days));
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignment a
             WHERE a.status = 'assigned' AND a.assigned_at < ?1
               AND NOT EXISTS (
                   SELECT 1 FROM alert_outcome o
                   WHERE o.assignment_id = a.assignment_id)
             ORDER BY a.assigned_at ASC"
        ))?;
        let raw = stmt
            .query_map(params![cutoff], row_to_assignment)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);
        raw.into_iter().map(finish_assignment).collect()
    }

    // ── Assignment test helpers ──────────────────────────────────────────────

    /// Shift an assignment's timestamp into the past. Tests use this to
    /// manufacture stale rows without sleeping.
    pub fn backdate_assignment(&self, assignment_id: &str, days: i64) -> RoutingResult<()> {
        let backdated = format_ts(Utc::now() - Duration::days(days));
        self.conn.lock().execute(
            "UPDATE assignment SET assigned_at = ?1 WHERE assignment_id = ?2",
            params![backdated, assignment_id],
        )?;
        Ok(())
    }

    pub fn assignment_count(&self) -> RoutingResult<i64> {
        Ok(self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM assignment", [], |r| r.get(0))?)
    }

    pub fn assignment_status_count(&self, status: AssignmentStatus) -> RoutingResult<i64> {
        Ok(self.conn.lock().query_row(
            "SELECT COUNT(*) FROM assignment WHERE status = ?1",
            params![status.as_str()],
            |r| r.get(0),
        )?)
    }
}
