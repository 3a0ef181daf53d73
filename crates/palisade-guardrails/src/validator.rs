//! Guardrail validation orchestration.
//!
//! [`GuardrailValidator`] combines the policy store, the ephemeral-mode state
//! machine, and an optional external evaluator into the path / budget / task
//! entry points. Path validation runs in a fixed order:
//!
//! 1. Ephemeral expiry tick.
//! 2. Ephemeral critical-path bypass (returns allowed).
//! 3. External evaluator, if configured (failures logged, never fatal).
//! 4. Local forbidden-path policies in order; a fail-closed block
//!    short-circuits the scan.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde_json::Value;

use crate::budget::BudgetKind;
use crate::config::GuardrailConfig;
use crate::ephemeral::{EphemeralMode, EphemeralStatus};
use crate::error::GuardrailResult;
use crate::evaluator::PathRuleEvaluator;
use crate::policy::{PolicyKind, Severity};
use crate::store::PolicyStore;
use crate::violation::{BudgetViolation, TaskValidation, Violation};

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Outcome of validating a single path.
#[derive(Debug, Clone)]
pub enum PathDecision {
    /// No rule matched, or the ephemeral bypass applied.
    Allowed,
    /// Rules matched but nothing blocked (warn severity, or fail-open
    /// configuration). The mutation may proceed; the violations are advisory.
    Flagged(Vec<Violation>),
    /// A blocking rule matched under fail-closed configuration.
    Blocked {
        /// Violations collected up to and including the blocking match.
        violations: Vec<Violation>,
        /// Message of the rule that blocked.
        reason: String,
    },
}

impl PathDecision {
    /// Whether the path passed with no findings at all.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Whether the path was refused.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    /// The collected violations, empty when allowed.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Allowed => &[],
            Self::Flagged(violations) | Self::Blocked { violations, .. } => violations,
        }
    }
}

impl fmt::Display for PathDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "allowed"),
            Self::Flagged(violations) => write!(f, "flagged ({} violations)", violations.len()),
            Self::Blocked { reason, .. } => write!(f, "blocked: {reason}"),
        }
    }
}

/// Outcome of validating a resource count against the budgets of one kind.
#[derive(Debug, Clone)]
pub enum BudgetDecision {
    /// Every enabled budget of the kind has headroom.
    Allowed,
    /// Limits exceeded under fail-open configuration; advisory only.
    Flagged(Vec<BudgetViolation>),
    /// A limit exceeded under fail-closed configuration.
    Exceeded {
        /// Violations collected up to and including the exceeding budget.
        violations: Vec<BudgetViolation>,
        /// Message of the budget that blocked.
        reason: String,
    },
}

impl BudgetDecision {
    /// Whether the count passed with no findings.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Whether the count was refused.
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        matches!(self, Self::Exceeded { .. })
    }

    /// The collected violations, empty when allowed.
    #[must_use]
    pub fn violations(&self) -> &[BudgetViolation] {
        match self {
            Self::Allowed => &[],
            Self::Flagged(violations) | Self::Exceeded { violations, .. } => violations,
        }
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Orchestrates path, budget, and task validation.
pub struct GuardrailValidator {
    store: Arc<PolicyStore>,
    ephemeral: EphemeralMode,
    config: RwLock<GuardrailConfig>,
    evaluator: Option<Arc<dyn PathRuleEvaluator>>,
}

impl fmt::Debug for GuardrailValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardrailValidator")
            .field("config", &self.config())
            .field("ephemeral", &self.ephemeral)
            .field("has_evaluator", &self.evaluator.is_some())
            .finish_non_exhaustive()
    }
}

impl GuardrailValidator {
    /// Creates a validator over `store` with default configuration and no
    /// external evaluator.
    #[must_use]
    pub fn new(store: Arc<PolicyStore>) -> Self {
        Self {
            store,
            ephemeral: EphemeralMode::new(),
            config: RwLock::new(GuardrailConfig::default()),
            evaluator: None,
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(self, config: GuardrailConfig) -> Self {
        *self.write_config() = config;
        self
    }

    /// Attaches an external rule evaluator.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: Arc<dyn PathRuleEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// The policy store this validator reads from.
    #[must_use]
    pub fn store(&self) -> &Arc<PolicyStore> {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> GuardrailConfig {
        self.read_config().clone()
    }

    /// Replaces the configuration.
    pub fn update_config(&self, config: GuardrailConfig) {
        *self.write_config() = config;
        tracing::info!("updated guardrail configuration");
    }

    // -----------------------------------------------------------------------
    // Ephemeral mode
    // -----------------------------------------------------------------------

    /// Enables the ephemeral critical-path bypass for `ttl`.
    ///
    /// Only the scaffold / deps_fix task kinds may enable it; see
    /// [`EphemeralMode::enable`].
    pub fn enable_ephemeral(
        &self,
        task_id: &str,
        task_kind: &str,
        ttl: Duration,
    ) -> GuardrailResult<()> {
        self.ephemeral.enable(task_id, task_kind, ttl)
    }

    /// Enables the bypass for the configured default timeout.
    pub fn enable_ephemeral_default(&self, task_id: &str, task_kind: &str) -> GuardrailResult<()> {
        let ttl = self.read_config().ephemeral_timeout();
        self.ephemeral.enable(task_id, task_kind, ttl)
    }

    /// Disables the bypass.
    pub fn disable_ephemeral(&self) {
        self.ephemeral.disable();
    }

    /// Current ephemeral state snapshot.
    #[must_use]
    pub fn ephemeral_status(&self) -> EphemeralStatus {
        self.ephemeral.status()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Validates a single path against the forbidden-path policies.
    pub async fn validate_path(&self, path: &str) -> PathDecision {
        let config = self.config();
        if !config.enable_path_validation {
            return PathDecision::Allowed;
        }

        self.ephemeral.tick();

        if config.enable_ephemeral_mode && self.ephemeral.bypasses(path) {
            tracing::info!("critical path {path} allowed in ephemeral mode");
            return PathDecision::Allowed;
        }

        let mut violations = Vec::new();

        // Evaluator verdicts supplement local policy; they never short-circuit.
        if let Some(evaluator) = &self.evaluator {
            violations.extend(self.consult_evaluator(evaluator.as_ref(), path).await);
        }

        let ephemeral_active = self.ephemeral.is_active();
        for policy in self.store.policies() {
            if !policy.enabled || policy.kind != PolicyKind::ForbiddenPath {
                continue;
            }
            for rule in &policy.rules {
                if !rule.matches(path) {
                    continue;
                }
                violations.push(
                    Violation::new(&policy.id, &rule.id, policy.severity, &rule.message, path)
                        .with_context("pattern", Value::String(rule.pattern.clone()))
                        .with_context("ephemeral_mode", Value::Bool(ephemeral_active))
                        .with_context("fail_closed", Value::Bool(config.fail_closed)),
                );

                if config.fail_closed && policy.severity == Severity::Block {
                    tracing::error!("guardrail violation blocked: {path} - {}", rule.message);
                    return PathDecision::Blocked {
                        reason: rule.message.clone(),
                        violations,
                    };
                }
            }
        }

        if violations.is_empty() {
            PathDecision::Allowed
        } else {
            PathDecision::Flagged(violations)
        }
    }

    /// Validates a running count against every enabled budget of `kind`.
    #[must_use]
    pub fn validate_budget(&self, kind: BudgetKind, current: u64) -> BudgetDecision {
        let config = self.config();
        let mut violations = Vec::new();

        for budget in self.store.budgets() {
            if !budget.enabled || budget.kind != kind {
                continue;
            }
            if current > budget.limit {
                let message =
                    format!("budget exceeded: {current} {} (limit: {})", budget.unit, budget.limit);
                violations.push(
                    BudgetViolation::new(&budget.id, kind, current, budget.limit, budget.unit, &message)
                        .with_context("time_window_secs", Value::from(budget.time_window_secs))
                        .with_context("fail_closed", Value::Bool(config.fail_closed)),
                );

                if config.fail_closed {
                    tracing::error!("budget violation blocked: {message}");
                    return BudgetDecision::Exceeded {
                        reason: message,
                        violations,
                    };
                }
            }
        }

        if violations.is_empty() {
            BudgetDecision::Allowed
        } else {
            BudgetDecision::Flagged(violations)
        }
    }

    /// Validates one task's worth of changes: every path, then the files
    /// budget, then the lines budget.
    ///
    /// A blocking path or budget decision aborts validation there, setting the
    /// result's error; remaining stages are not evaluated.
    pub async fn validate_task(
        &self,
        task_id: &str,
        files: &[String],
        lines_changed: u64,
    ) -> TaskValidation {
        let config = self.config();
        let mut result = TaskValidation::new(task_id);
        if !config.enable_task_validation {
            return result;
        }

        for file in files {
            match self.validate_path(file).await {
                PathDecision::Allowed => {}
                PathDecision::Flagged(violations) => result.violations.extend(violations),
                PathDecision::Blocked { violations, reason } => {
                    result.violations.extend(violations);
                    result.valid = false;
                    result.error = Some(format!("guardrail violation: {reason}"));
                    return result;
                }
            }
        }

        if config.enable_budget_tracking {
            let file_count = u64::try_from(files.len()).unwrap_or(u64::MAX);
            let checks = [(BudgetKind::Files, file_count), (BudgetKind::Lines, lines_changed)];
            for (kind, current) in checks {
                match self.validate_budget(kind, current) {
                    BudgetDecision::Allowed => {}
                    BudgetDecision::Flagged(violations) => {
                        result.budget_violations.extend(violations);
                    }
                    BudgetDecision::Exceeded { violations, reason } => {
                        result.budget_violations.extend(violations);
                        result.valid = false;
                        result.error = Some(format!("budget violation: {reason}"));
                        return result;
                    }
                }
            }
        }

        if !result.violations.is_empty() || !result.budget_violations.is_empty() {
            result.valid = false;
            if config.fail_closed {
                result.error = Some("task validation failed due to guardrail violations".to_string());
            }
        }

        result
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn consult_evaluator(
        &self,
        evaluator: &dyn PathRuleEvaluator,
        path: &str,
    ) -> Vec<Violation> {
        match evaluator.evaluate(path).await {
            Ok(report) if !report.valid => report
                .violations
                .into_iter()
                .map(|v| {
                    Violation::new("external-policy", &v.kind, Severity::Block, &v.message, path)
                        .with_context("external", Value::Bool(true))
                })
                .collect(),
            Ok(_) => Vec::new(),
            Err(e) => {
                tracing::warn!("external rule evaluation failed for {path}: {e}");
                Vec::new()
            }
        }
    }

    fn read_config(&self) -> RwLockReadGuard<'_, GuardrailConfig> {
        self.config.read().unwrap_or_else(|e| {
            tracing::warn!("guardrail config lock poisoned; recovering");
            e.into_inner()
        })
    }

    fn write_config(&self) -> RwLockWriteGuard<'_, GuardrailConfig> {
        self.config.write().unwrap_or_else(|e| {
            tracing::warn!("guardrail config lock poisoned; recovering");
            e.into_inner()
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
