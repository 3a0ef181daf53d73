//! Combined gate configuration.
//!
//! One TOML document configures both halves of the gate:
//!
//! ```toml
//! [guardrails]
//! fail_closed = true
//! ephemeral_timeout_secs = 300
//!
//! [apply]
//! backup_files = true
//! languages = ["rust", "go"]
//! ```
//!
//! Absent sections and keys fall back to the defaults.

use std::path::Path;

use palisade_apply::ApplyEngineConfig;
use palisade_guardrails::GuardrailConfig;
use serde::{Deserialize, Serialize};

use crate::error::{GateError, GateResult};

/// Configuration for the validator and the apply engine together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PalisadeConfig {
    /// Guardrail validator settings.
    pub guardrails: GuardrailConfig,
    /// Apply engine settings.
    pub apply: ApplyEngineConfig,
}

impl PalisadeConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> GateResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> GateResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| GateError::ReadConfig {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
