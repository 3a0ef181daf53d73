//! External path-rule evaluator seam.
//!
//! An optional collaborator — typically an organization-wide policy service —
//! consulted ahead of local policies. Its verdicts supplement local
//! evaluation; its failures are logged as warnings and never fatal.

use async_trait::async_trait;

use crate::error::GuardrailResult;

/// A violation reported by an external evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorViolation {
    /// Evaluator-specific violation kind.
    pub kind: String,
    /// Human-readable reason.
    pub message: String,
}

impl EvaluatorViolation {
    /// Creates a violation.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Verdict returned by an external evaluator.
#[derive(Debug, Clone)]
pub struct RuleEvaluation {
    /// Whether the evaluator considers the path acceptable.
    pub valid: bool,
    /// Violations backing an invalid verdict.
    pub violations: Vec<EvaluatorViolation>,
}

impl RuleEvaluation {
    /// A passing verdict.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            valid: true,
            violations: Vec::new(),
        }
    }

    /// A failing verdict carrying its violations.
    #[must_use]
    pub fn deny(violations: Vec<EvaluatorViolation>) -> Self {
        Self {
            valid: false,
            violations,
        }
    }
}

/// External rule evaluation consulted before local policies.
///
/// Implementations should return
/// [`GuardrailError::Evaluator`](crate::GuardrailError::Evaluator) for
/// evaluator-side failures; the validator downgrades those to warnings.
#[async_trait]
pub trait PathRuleEvaluator: Send + Sync {
    /// Evaluates `path` and returns a verdict.
    async fn evaluate(&self, path: &str) -> GuardrailResult<RuleEvaluation>;
}
