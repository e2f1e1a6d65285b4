//! Runtime configuration
//!
//! Loaded from a TOML file. Every section and field is optional; missing values fall
//! back to the defaults below.

use std::path::Path;

use serde::Deserialize;

use crate::error::RiskError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProctorConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_exam_id")]
    pub exam_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_user_id() -> String {
    "anonymous".to_string()
}
fn default_exam_id() -> String {
    "unknown".to_string()
}
fn default_log_filter() -> String {
    "proctor_risk=info".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            exam_id: default_exam_id(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl ProctorConfig {
    pub fn from_toml(content: &str) -> Result<Self, RiskError> {
        toml::from_str(content).map_err(|e| RiskError::ConfigError(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RiskError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RiskError::ConfigError(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }
}
