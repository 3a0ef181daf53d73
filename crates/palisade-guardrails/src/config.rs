//! Guardrail validator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Flat configuration for the guardrail validator.
///
/// Every stage can be toggled independently. Defaults are all-enabled with
/// fail-closed semantics and a five-minute ephemeral window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Abort on the first blocking violation instead of collect-and-report.
    pub fail_closed: bool,
    /// Consult the ephemeral critical-path bypass during path validation.
    pub enable_ephemeral_mode: bool,
    /// Default time-to-live for ephemeral mode, in seconds.
    pub ephemeral_timeout_secs: u64,
    /// Run task-level aggregation in `validate_task`.
    pub enable_task_validation: bool,
    /// Run budget checks during task validation.
    pub enable_budget_tracking: bool,
    /// Run per-path policy checks.
    pub enable_path_validation: bool,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            fail_closed: true,
            enable_ephemeral_mode: true,
            ephemeral_timeout_secs: 300,
            enable_task_validation: true,
            enable_budget_tracking: true,
            enable_path_validation: true,
        }
    }
}

impl GuardrailConfig {
    /// Default ephemeral time-to-live as a [`Duration`].
    #[must_use]
    pub fn ephemeral_timeout(&self) -> Duration {
        Duration::from_secs(self.ephemeral_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardrailConfig::default();
        assert!(config.fail_closed);
        assert!(config.enable_ephemeral_mode);
        assert_eq!(config.ephemeral_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: GuardrailConfig =
            serde_json::from_str(r#"{"fail_closed": false}"#).unwrap();
        assert!(!config.fail_closed);
        assert!(config.enable_path_validation);
        assert_eq!(config.ephemeral_timeout_secs, 300);
    }
}
