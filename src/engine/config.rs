//! Engine configuration.

use super::error::EngineError;
use crate::policy::ErrorPolicyKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for an engine.
///
/// # Example
///
/// ```rust
/// use easyflow::engine::EngineConfig;
/// use easyflow::policy::ErrorPolicyKind;
///
/// let config = EngineConfig::from_json(
///     r#"{ "name": "orders", "default_error_policy": "StopWorkflow" }"#,
/// ).unwrap();
///
/// assert_eq!(config.name, "orders");
/// assert_eq!(config.default_error_policy, ErrorPolicyKind::StopWorkflow);
/// assert_eq!(config.fetch_timeout(), None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine name, used in log fields
    pub name: String,
    /// Policy for states without an override
    pub default_error_policy: ErrorPolicyKind,
    /// Overrides the data source's own fetch timeout, in milliseconds
    pub fetch_timeout_ms: Option<u64>,
}

impl EngineConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "workflow".to_string(),
            default_error_policy: ErrorPolicyKind::Throw,
            fetch_timeout_ms: None,
        }
    }
}
