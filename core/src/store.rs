//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database. The evaluator, selector,
//! and coordinator call store methods — they never execute SQL directly.
//!
//! The connection sits behind a `parking_lot::Mutex`, so a `RouteStore`
//! shared through an `Arc` is safe to use from many routing threads. Every
//! method holds the lock for a single short statement (or one explicit
//! read-modify sequence), never across engine logic; the atomic capacity
//! operations are single conditional UPDATEs and need no lock of their own.

use crate::{
    error::{RoutingError, RoutingResult},
    event::RouteEventEntry,
};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

mod agent;
mod assignment;
mod outcome;
mod rule;

pub struct RouteStore {
    conn: Mutex<Connection>,
}

impl RouteStore {
    /// Open (or create) the routing database at `path`.
    pub fn open(path: &str) -> RoutingResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance for file stores.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (used in tests and the runner's default).
    pub fn in_memory() -> RoutingResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RoutingResult<()> {
        self.conn
            .lock()
            .execute_batch(include_str!("../migrations/001_routing.sql"))?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, event_type: &str, payload: &str) -> RoutingResult<()> {
        self.conn.lock().execute(
            "INSERT INTO route_event (event_type, payload, recorded_at)
             VALUES (?1, ?2, ?3)",
            params![event_type, payload, now_string()],
        )?;
        Ok(())
    }

    pub fn events_by_type(&self, event_type: &str) -> RoutingResult<Vec<RouteEventEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, event_type, payload, recorded_at
             FROM route_event WHERE event_type = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![event_type], |row| {
                Ok(RouteEventEntry {
                    id: Some(row.get(0)?),
                    event_type: row.get(1)?,
                    payload: row.get(2)?,
                    recorded_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self) -> RoutingResult<i64> {
        Ok(self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM route_event", [], |r| r.get(0))?)
    }
}

/// Canonical timestamp format for every stored column: RFC 3339 UTC with
/// microsecond precision. Fixed-width, so string comparison orders by time.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn now_string() -> String {
    format_ts(Utc::now())
}

pub(crate) fn parse_ts(raw: &str) -> RoutingResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RoutingError::ConsistencyViolation {
            detail: format!("unparseable stored timestamp '{raw}': {e}"),
        })
}
