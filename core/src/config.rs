//! Engine configuration and seed-file formats.
//!
//! Engine knobs come from `RoutingConfig` (defaults or a JSON file). The
//! seed-file structs are the catalog formats `route-runner` loads into the
//! store; they mirror the stored parameter-bag shapes, not the resolved
//! enums, so seed files round-trip through the same load-time validation as
//! administratively created rules.

use crate::error::RoutingResult;
use crate::rule::{RawAction, RawCondition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

fn default_reserve_attempts() -> u32 {
    3
}
fn default_stale_age_days() -> i64 {
    3
}
fn default_escalation_queue() -> String {
    "supervisor-queue".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Retry budget for the snapshot → pick → reserve critical section.
    #[serde(default = "default_reserve_attempts")]
    pub max_reserve_attempts: u32,
    /// Default age threshold for the stale-work reaper.
    #[serde(default = "default_stale_age_days")]
    pub default_stale_age_days: i64,
    /// Sentinel queue name recorded on escalated assignments.
    #[serde(default = "default_escalation_queue")]
    pub escalation_queue: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_reserve_attempts: default_reserve_attempts(),
            default_stale_age_days: default_stale_age_days(),
            escalation_queue: default_escalation_queue(),
        }
    }
}

impl RoutingConfig {
    pub fn from_file(path: &Path) -> RoutingResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read {}: {e}", path.display()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

// ── Seed catalogs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSeed {
    pub id: String,
    pub name: String,
    pub priority: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: Vec<RawCondition>,
    pub actions: Vec<RawAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSeed {
    pub agent_id: String,
    pub max_concurrent: u32,
    #[serde(default)]
    pub territories: BTreeSet<String>,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    #[serde(default)]
    pub specializations: BTreeSet<String>,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default = "default_true")]
    pub auto_assign: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleCatalogFile {
    pub rules: Vec<RuleSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentCatalogFile {
    pub agents: Vec<AgentSeed>,
}

impl RuleCatalogFile {
    pub fn from_file(path: &Path) -> RoutingResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read {}: {e}", path.display()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl AgentCatalogFile {
    pub fn from_file(path: &Path) -> RoutingResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read {}: {e}", path.display()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
