//! Error types for guardrail operations.

use thiserror::Error;

/// Errors raised while administering policies or toggling ephemeral mode.
///
/// Validation itself never returns these: path and budget checks report their
/// outcome through [`PathDecision`](crate::PathDecision) and
/// [`BudgetDecision`](crate::BudgetDecision) instead.
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// A policy with the same ID is already registered.
    #[error("policy with ID {id} already exists")]
    DuplicatePolicy {
        /// The conflicting policy ID.
        id: String,
    },

    /// No policy with the given ID is registered.
    #[error("policy with ID {id} not found")]
    PolicyNotFound {
        /// The missing policy ID.
        id: String,
    },

    /// A budget policy with the same ID is already registered.
    #[error("budget policy with ID {id} already exists")]
    DuplicateBudget {
        /// The conflicting budget policy ID.
        id: String,
    },

    /// No budget policy with the given ID is registered.
    #[error("budget policy with ID {id} not found")]
    BudgetNotFound {
        /// The missing budget policy ID.
        id: String,
    },

    /// Ephemeral mode was requested for a task kind outside the allow-list.
    #[error("ephemeral mode only allowed for scaffold/deps_fix tasks, got {kind:?}")]
    EphemeralNotAllowed {
        /// The rejected task kind.
        kind: String,
    },

    /// An external rule evaluator failed to produce a verdict.
    ///
    /// The validator treats this as a non-fatal warning; the variant exists so
    /// evaluator implementations have a uniform error to return.
    #[error("external rule evaluation failed: {0}")]
    Evaluator(String),
}

/// Result type for guardrail operations.
pub type GuardrailResult<T> = Result<T, GuardrailError>;
