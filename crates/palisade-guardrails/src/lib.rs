//! Palisade Guardrails - policy gate for automated file mutations.
//!
//! This crate decides whether a proposed set of file changes may proceed. It
//! combines three checks behind one validator:
//!
//! - **Forbidden paths**: ordered [`GuardrailPolicy`] rule lists matched
//!   against candidate paths, glob or regex per rule.
//! - **Budgets**: per-window caps on files, lines, and tokens via
//!   [`BudgetPolicy`], with an optional [`BudgetLedger`] for callers that
//!   track running usage.
//! - **Ephemeral mode**: a time-boxed bypass that lets scaffold and
//!   dependency-fix tasks touch manifests and lockfiles the policies would
//!   otherwise block.
//!
//! [`GuardrailValidator`] is the entry point; [`PolicyStore`] holds the
//! editable policy sets; [`PathRuleEvaluator`] is the seam for plugging in an
//! external policy service.
//!
//! # Fail-closed vs fail-open
//!
//! Under the default fail-closed configuration a blocking rule match or an
//! exceeded budget aborts validation. Fail-open keeps collecting: matches are
//! reported as advisory violations and the caller decides.
//!
//! # Example
//!
//! ```
//! use palisade_guardrails::{BudgetKind, GuardrailValidator, PolicyStore};
//! use std::sync::Arc;
//!
//! // Bootstrapped store: forbidden-path policy plus the three budgets.
//! let validator = GuardrailValidator::new(Arc::new(PolicyStore::default()));
//!
//! let policies = validator.store().policies();
//! assert!(policies[0].rules.iter().any(|r| r.matches("package-lock.json")));
//!
//! // Budgets compare a running count against the per-window limit.
//! assert!(validator.validate_budget(BudgetKind::Files, 10).is_allowed());
//! assert!(validator.validate_budget(BudgetKind::Files, 151).is_exceeded());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod budget;
pub mod config;
pub mod ephemeral;
/// Error types and results for the guardrails crate.
pub mod error;
pub mod evaluator;
pub mod policy;
pub mod store;
pub mod validator;
pub mod violation;

pub use budget::{BudgetKind, BudgetLedger, BudgetPolicy, BudgetUnit, DEFAULT_TIME_WINDOW_SECS};
pub use config::GuardrailConfig;
pub use ephemeral::{ALLOWED_TASK_KINDS, EphemeralMode, EphemeralStatus, is_critical_path};
pub use error::{GuardrailError, GuardrailResult};
pub use evaluator::{EvaluatorViolation, PathRuleEvaluator, RuleEvaluation};
pub use policy::{GuardrailPolicy, GuardrailRule, PolicyKind, RuleAction, Severity};
pub use store::PolicyStore;
pub use validator::{BudgetDecision, GuardrailValidator, PathDecision};
pub use violation::{BudgetViolation, TaskValidation, Violation};
