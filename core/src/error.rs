use crate::types::{AgentId, AlertId, RuleId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Agent '{agent_id}' not found")]
    AgentNotFound { agent_id: AgentId },

    #[error("Rule '{rule_id}' not found")]
    RuleNotFound { rule_id: RuleId },

    #[error("Alert '{alert_id}' has no active assignment")]
    NoActiveAssignment { alert_id: AlertId },

    #[error("Consistency violation: {detail}")]
    ConsistencyViolation { detail: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
