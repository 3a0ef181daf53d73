//! Violation and task-validation records.
//!
//! These are immutable value types: validators construct them, callers report
//! them. The `context` maps carry audit detail (matched pattern, live
//! configuration flags) without widening the structs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::budget::{BudgetKind, BudgetUnit};
use crate::policy::Severity;

/// A forbidden-path rule match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Policy that produced the match.
    pub policy_id: String,
    /// Rule within the policy.
    pub rule_id: String,
    /// Severity inherited from the policy.
    pub severity: Severity,
    /// Human-readable reason.
    pub message: String,
    /// Path that matched.
    pub file_path: String,
    /// When the violation was recorded.
    pub timestamp: DateTime<Utc>,
    /// Audit context.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, Value>,
}

impl Violation {
    /// Creates a violation stamped with the current time.
    pub fn new(
        policy_id: impl Into<String>,
        rule_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            policy_id: policy_id.into(),
            rule_id: rule_id.into(),
            severity,
            message: message.into(),
            file_path: file_path.into(),
            timestamp: Utc::now(),
            context: HashMap::new(),
        }
    }

    /// Attaches one context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}

/// A budget limit exceeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetViolation {
    /// Budget policy that was exceeded.
    pub policy_id: String,
    /// Resource kind the budget constrains.
    pub kind: BudgetKind,
    /// Observed usage.
    pub current: u64,
    /// Configured limit.
    pub limit: u64,
    /// Unit the limit is expressed in.
    pub unit: BudgetUnit,
    /// Human-readable reason.
    pub message: String,
    /// When the violation was recorded.
    pub timestamp: DateTime<Utc>,
    /// Audit context.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, Value>,
}

impl BudgetViolation {
    /// Creates a budget violation stamped with the current time.
    pub fn new(
        policy_id: impl Into<String>,
        kind: BudgetKind,
        current: u64,
        limit: u64,
        unit: BudgetUnit,
        message: impl Into<String>,
    ) -> Self {
        Self {
            policy_id: policy_id.into(),
            kind,
            current,
            limit,
            unit,
            message: message.into(),
            timestamp: Utc::now(),
            context: HashMap::new(),
        }
    }

    /// Attaches one context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}

/// Aggregated outcome of validating one task's worth of changes.
///
/// `valid` is true iff both violation lists are empty. `error` is set only
/// when a fail-closed block aborted validation, or when every stage ran but
/// violations remain under fail-closed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskValidation {
    /// Task the validation belongs to.
    pub task_id: String,
    /// Overall verdict.
    pub valid: bool,
    /// Abort reason under fail-closed configuration.
    pub error: Option<String>,
    /// Path violations, in evaluation order.
    pub violations: Vec<Violation>,
    /// Budget violations, in evaluation order.
    pub budget_violations: Vec<BudgetViolation>,
    /// When the validation ran.
    pub timestamp: DateTime<Utc>,
}

impl TaskValidation {
    /// Creates an empty, passing result for `task_id`.
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            valid: true,
            error: None,
            violations: Vec::new(),
            budget_violations: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Total violations of both kinds.
    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.violations.len().saturating_add(self.budget_violations.len())
    }
}
