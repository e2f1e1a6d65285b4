//! Error types for proctor-risk

use thiserror::Error;

/// Errors that can occur while scoring or aggregating observations
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Invalid observation field `{field}`: {reason}")]
    InvalidObservation { field: &'static str, reason: String },

    #[error("Invalid assessment: {0}")]
    InvalidAssessment(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Tick contains no observations")]
    EmptyTick,
}

impl RiskError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        RiskError::InvalidObservation {
            field,
            reason: reason.into(),
        }
    }
}
