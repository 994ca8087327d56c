//! Routing rule storage and load-time resolution.

use super::{now_string, RouteStore};
use crate::{
    config::RuleSeed,
    error::{RoutingError, RoutingResult},
    rule::RoutingRule,
};
use rusqlite::{params, OptionalExtension};

/// Raw rule row before parameter-bag resolution.
struct RuleRow {
    seq: i64,
    rule_id: String,
    name: String,
    priority: i64,
    enabled: bool,
    conditions: String,
    actions: String,
}

impl RuleRow {
    fn resolve(self) -> Result<RoutingRule, String> {
        RoutingRule::resolve(
            self.rule_id,
            self.name,
            self.priority,
            self.enabled,
            self.seq,
            &self.conditions,
            &self.actions,
        )
    }
}

const RULE_COLUMNS: &str = "seq, rule_id, name, priority, enabled, conditions, actions";

fn row_to_rule(row: &rusqlite::Row<'_>) -> rusqlite::Result<RuleRow> {
    Ok(RuleRow {
        seq: row.get(0)?,
        rule_id: row.get(1)?,
        name: row.get(2)?,
        priority: row.get(3)?,
        enabled: row.get::<_, i32>(4)? != 0,
        conditions: row.get(5)?,
        actions: row.get(6)?,
    })
}

impl RouteStore {
    pub fn insert_rule(&self, seed: &RuleSeed) -> RoutingResult<()> {
        self.conn.lock().execute(
            "INSERT INTO routing_rule (rule_id, name, priority, enabled,
                conditions, actions, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                seed.id,
                seed.name,
                seed.priority,
                seed.enabled as i32,
                serde_json::to_string(&seed.conditions)?,
                serde_json::to_string(&seed.actions)?,
                now_string(),
            ],
        )?;
        Ok(())
    }

    /// Soft-disable (or re-enable) a rule. Rules are never deleted, to
    /// preserve the audit history behind past assignments.
    pub fn set_rule_enabled(&self, rule_id: &str, enabled: bool) -> RoutingResult<()> {
        let changed = self.conn.lock().execute(
            "UPDATE routing_rule SET enabled = ?1 WHERE rule_id = ?2",
            params![enabled as i32, rule_id],
        )?;
        if changed == 0 {
            return Err(RoutingError::RuleNotFound {
                rule_id: rule_id.to_string(),
            });
        }
        Ok(())
    }

    /// Enabled rules in evaluation order: priority descending, then
    /// creation order ascending. A rule whose stored JSON fails to resolve
    /// degrades to "never matches": it is logged and excluded.
    pub fn list_enabled_rules(&self) -> RoutingResult<Vec<RoutingRule>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM routing_rule
             WHERE enabled = 1
             ORDER BY priority DESC, seq ASC"
        ))?;
        let rows = stmt
            .query_map([], row_to_rule)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            let rule_id = row.rule_id.clone();
            match row.resolve() {
                Ok(rule) => rules.push(rule),
                Err(reason) => {
                    log::warn!("rule '{rule_id}' is malformed and will never match: {reason}");
                }
            }
        }
        Ok(rules)
    }

    pub fn get_rule(&self, rule_id: &str) -> RoutingResult<RoutingRule> {
        let row = self
            .conn
            .lock()
            .query_row(
                &format!("SELECT {RULE_COLUMNS} FROM routing_rule WHERE rule_id = ?1"),
                params![rule_id],
                row_to_rule,
            )
            .optional()?;
        match row {
            Some(row) => row.resolve().map_err(|reason| {
                RoutingError::ConsistencyViolation {
                    detail: format!("stored rule '{rule_id}' is malformed: {reason}"),
                }
            }),
            None => Err(RoutingError::RuleNotFound {
                rule_id: rule_id.to_string(),
            }),
        }
    }

    // ── Rule test helpers ────────────────────────────────────────────────────

    pub fn rule_count(&self) -> RoutingResult<i64> {
        Ok(self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM routing_rule", [], |r| r.get(0))?)
    }
}
