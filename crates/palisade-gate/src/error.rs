//! Gate-level error types.

use palisade_apply::ApplyError;
use palisade_guardrails::{GuardrailError, TaskValidation};
use thiserror::Error;

/// Errors surfaced by the mutation gate.
#[derive(Debug, Error)]
pub enum GateError {
    /// A guardrail operation failed.
    #[error(transparent)]
    Guardrail(#[from] GuardrailError),

    /// An apply-engine operation failed.
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// Task validation refused the batch before anything was applied.
    #[error("batch rejected: {reason}")]
    Rejected {
        /// The validator's abort reason.
        reason: String,
        /// Full validation report, including every recorded violation.
        report: Box<TaskValidation>,
    },

    /// A configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ReadConfig {
        /// File being read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),
}

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;
