//! Agent directory queries and atomic capacity accounting.

use super::RouteStore;
use crate::{
    directory::AgentProfile,
    error::{RoutingError, RoutingResult},
    event::{event_type_name, RouteEvent},
};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::BTreeSet;

fn sets_to_json(set: &BTreeSet<String>) -> RoutingResult<String> {
    Ok(serde_json::to_string(set)?)
}

fn row_to_agent(row: &Row<'_>) -> rusqlite::Result<(AgentProfile, String, String, String)> {
    Ok((
        AgentProfile {
            agent_id: row.get(0)?,
            max_concurrent: row.get::<_, i64>(1)? as u32,
            current_load: row.get::<_, i64>(2)? as u32,
            territories: BTreeSet::new(),
            skills: BTreeSet::new(),
            specializations: BTreeSet::new(),
            available: row.get::<_, i32>(6)? != 0,
            auto_assign: row.get::<_, i32>(7)? != 0,
        },
        row.get::<_, String>(3)?,
        row.get::<_, String>(4)?,
        row.get::<_, String>(5)?,
    ))
}

fn finish_agent(
    (mut agent, territories, skills, specializations): (AgentProfile, String, String, String),
) -> RoutingResult<AgentProfile> {
    agent.territories = serde_json::from_str(&territories)?;
    agent.skills = serde_json::from_str(&skills)?;
    agent.specializations = serde_json::from_str(&specializations)?;
    Ok(agent)
}

const AGENT_COLUMNS: &str = "agent_id, max_concurrent, current_load,
             territories, skills, specializations, available, auto_assign";

impl RouteStore {
    pub fn upsert_agent(&self, agent: &AgentProfile) -> RoutingResult<()> {
        self.conn.lock().execute(
            "INSERT INTO agent (agent_id, max_concurrent, current_load,
                territories, skills, specializations, available, auto_assign)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(agent_id) DO UPDATE SET
                max_concurrent = excluded.max_concurrent,
                territories = excluded.territories,
                skills = excluded.skills,
                specializations = excluded.specializations,
                available = excluded.available,
                auto_assign = excluded.auto_assign",
            params![
                agent.agent_id,
                agent.max_concurrent as i64,
                agent.current_load as i64,
                sets_to_json(&agent.territories)?,
                sets_to_json(&agent.skills)?,
                sets_to_json(&agent.specializations)?,
                agent.available as i32,
                agent.auto_assign as i32,
            ],
        )?;
        Ok(())
    }

    pub fn get_agent(&self, agent_id: &str) -> RoutingResult<AgentProfile> {
        let raw = self
            .conn
            .lock()
            .query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agent WHERE agent_id = ?1"),
                params![agent_id],
                row_to_agent,
            )
            .optional()?;
        match raw {
            Some(parts) => finish_agent(parts),
            None => Err(RoutingError::AgentNotFound {
                agent_id: agent_id.to_string(),
            }),
        }
    }

    /// Agents that could take work right now. Ordered by agent_id so
    /// downstream tie-breaks and round-robin rotations are reproducible.
    pub fn list_auto_assignable(&self) -> RoutingResult<Vec<AgentProfile>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {AGENT_COLUMNS} FROM agent
             WHERE available = 1 AND auto_assign = 1
               AND current_load < max_concurrent
             ORDER BY agent_id ASC"
        ))?;
        let raw = stmt
            .query_map([], row_to_agent)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);
        raw.into_iter().map(finish_agent).collect()
    }

    /// The atomic reservation: test-and-increment in one statement.
    /// Returns true iff a row changed, i.e. the agent existed, was
    /// available, and had spare capacity at commit time.
    pub fn try_reserve(&self, agent_id: &str) -> RoutingResult<bool> {
        let changed = self.conn.lock().execute(
            "UPDATE agent SET current_load = current_load + 1
             WHERE agent_id = ?1 AND available = 1
               AND current_load < max_concurrent",
            params![agent_id],
        )?;
        Ok(changed == 1)
    }

    /// The atomic release: conditional decrement, floor at zero.
    /// Returns false when the decrement would have gone negative — the
    /// caller treats that as a consistency violation, not a no-op.
    pub fn release_capacity(&self, agent_id: &str) -> RoutingResult<bool> {
        let changed = self.conn.lock().execute(
            "UPDATE agent SET current_load = current_load - 1
             WHERE agent_id = ?1 AND current_load > 0",
            params![agent_id],
        )?;
        Ok(changed == 1)
    }

    pub fn set_agent_available(&self, agent_id: &str, available: bool) -> RoutingResult<()> {
        self.admin_update(
            agent_id,
            "UPDATE agent SET available = ?1 WHERE agent_id = ?2",
            available as i32,
        )
    }

    pub fn set_agent_capacity(&self, agent_id: &str, max_concurrent: u32) -> RoutingResult<()> {
        self.admin_update(
            agent_id,
            "UPDATE agent SET max_concurrent = ?1 WHERE agent_id = ?2",
            max_concurrent as i32,
        )
    }

    fn admin_update(&self, agent_id: &str, sql: &str, value: i32) -> RoutingResult<()> {
        let changed = self.conn.lock().execute(sql, params![value, agent_id])?;
        if changed == 0 {
            return Err(RoutingError::AgentNotFound {
                agent_id: agent_id.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn append_capacity_anomaly(&self, agent_id: &str, detail: &str) -> RoutingResult<()> {
        let event = RouteEvent::CapacityAnomaly {
            agent_id: agent_id.to_string(),
            detail: detail.to_string(),
        };
        self.append_event(event_type_name(&event), &serde_json::to_string(&event)?)
    }

    // ── Agent test helpers ───────────────────────────────────────────────────

    pub fn agent_load(&self, agent_id: &str) -> RoutingResult<i64> {
        Ok(self.conn.lock().query_row(
            "SELECT current_load FROM agent WHERE agent_id = ?1",
            params![agent_id],
            |r| r.get(0),
        )?)
    }

    pub fn agent_count(&self) -> RoutingResult<i64> {
        Ok(self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM agent", [], |r| r.get(0))?)
    }
}
