//! The mutation gate.
//!
//! Runs guardrail validation strictly before the apply engine touches any
//! file: a batch is screened as a whole (every path, plus the file and line
//! budgets), rejected wholesale on a blocking verdict, and only then handed
//! to the engine. Successful applies are charged to a windowed usage ledger
//! so callers can watch cumulative consumption across batches.

use std::collections::HashSet;
use std::sync::Arc;

use palisade_apply::{
    ApplyEngine, ApplyOperation, ApplyResult, EditBatch, Formatter, ImportFixer,
};
use palisade_guardrails::{
    BudgetKind, BudgetLedger, GuardrailValidator, PolicyStore, TaskValidation,
};

use crate::config::PalisadeConfig;
use crate::error::{GateError, GateResult};

/// Guardrail validation composed in front of the apply engine.
#[derive(Debug)]
pub struct MutationGate {
    validator: Arc<GuardrailValidator>,
    engine: Arc<ApplyEngine>,
    ledger: BudgetLedger,
}

impl MutationGate {
    /// Creates a gate over an existing validator and engine.
    #[must_use]
    pub fn new(validator: Arc<GuardrailValidator>, engine: Arc<ApplyEngine>) -> Self {
        Self {
            validator,
            engine,
            ledger: BudgetLedger::default(),
        }
    }

    /// Creates a gate with the built-in policies from a combined
    /// configuration.
    #[must_use]
    pub fn from_config(config: PalisadeConfig) -> Self {
        let validator =
            GuardrailValidator::new(Arc::new(PolicyStore::default())).with_config(config.guardrails);
        let engine = ApplyEngine::new(config.apply);
        Self::new(Arc::new(validator), Arc::new(engine))
    }

    /// Registers a formatter collaborator for `language`.
    #[must_use]
    pub fn with_formatter(self, language: impl Into<String>, formatter: Arc<dyn Formatter>) -> Self {
        self.engine.register_formatter(language, formatter);
        self
    }

    /// Registers an import-fixer collaborator for `language`.
    #[must_use]
    pub fn with_import_fixer(self, language: impl Into<String>, fixer: Arc<dyn ImportFixer>) -> Self {
        self.engine.register_import_fixer(language, fixer);
        self
    }

    /// The guardrail validator behind the gate.
    #[must_use]
    pub fn validator(&self) -> &Arc<GuardrailValidator> {
        &self.validator
    }

    /// The apply engine behind the gate.
    #[must_use]
    pub fn engine(&self) -> &Arc<ApplyEngine> {
        &self.engine
    }

    /// In-window usage charged by successful batches.
    #[must_use]
    pub fn ledger(&self) -> &BudgetLedger {
        &self.ledger
    }

    // -----------------------------------------------------------------------
    // Batch operations
    // -----------------------------------------------------------------------

    /// Screens a batch without mutating anything.
    ///
    /// Each distinct path counts once toward the file budget; the line budget
    /// is charged with the newline-separated length of each operation's
    /// content, so deletes contribute nothing.
    pub async fn validate_batch(
        &self,
        task_id: &str,
        ops: &[ApplyOperation],
    ) -> TaskValidation {
        let (files, lines) = batch_accounting(ops);
        self.validator.validate_task(task_id, &files, lines).await
    }

    /// Screens and applies a batch.
    ///
    /// Operations run in order and stop at the first failed result; the
    /// shortened result list is still `Ok`, with per-operation failures
    /// reported inside the results. Successful results are charged to the
    /// usage ledger.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Rejected`] carrying the full validation report
    /// when the guardrails refuse the batch; no file is touched in that case.
    pub async fn apply_batch(
        &self,
        task_id: &str,
        ops: &[ApplyOperation],
    ) -> GateResult<Vec<ApplyResult>> {
        tracing::info!("gating batch of {} operations for task {task_id}", ops.len());

        let report = self.validate_batch(task_id, ops).await;
        if !report.valid {
            let reason = report.error.clone().unwrap_or_else(|| {
                format!(
                    "task validation failed with {} violations",
                    report.violation_count()
                )
            });
            tracing::warn!("rejected batch for task {task_id}: {reason}");
            return Err(GateError::Rejected {
                reason,
                report: Box::new(report),
            });
        }

        let results = self.engine.apply_operations(ops).await;
        self.charge(&results);

        let succeeded = results.iter().filter(|r| r.success).count();
        tracing::info!(
            "applied {succeeded}/{} operations for task {task_id}",
            results.len()
        );
        Ok(results)
    }

    /// Applies an edit batch document through the gate.
    ///
    /// The task id comes from the batch metadata when present.
    ///
    /// # Errors
    ///
    /// Same contract as [`apply_batch`](Self::apply_batch).
    pub async fn apply_edit_batch(&self, batch: &EditBatch) -> GateResult<Vec<ApplyResult>> {
        let task_id = batch.task_id().unwrap_or("untracked");
        let ops = batch.operations();
        self.apply_batch(task_id, &ops).await
    }

    /// Rolls back the successful results of a batch, newest first.
    ///
    /// # Errors
    ///
    /// Stops at the first rollback that fails and returns its engine error;
    /// results already rolled back stay rolled back.
    pub async fn rollback(&self, results: &[ApplyResult]) -> GateResult<()> {
        for result in results.iter().rev().filter(|r| r.success) {
            if let Err(e) = self.engine.rollback_operation(result).await {
                tracing::error!(
                    "failed to roll back operation {}: {e}",
                    result.operation_id
                );
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn charge(&self, results: &[ApplyResult]) {
        let mut paths = HashSet::new();
        let mut files: u64 = 0;
        let mut lines: u64 = 0;
        for result in results.iter().filter(|r| r.success) {
            if paths.insert(result.path.as_str()) {
                files = files.saturating_add(1);
            }
            lines = lines.saturating_add(u64::try_from(result.applied_lines).unwrap_or(u64::MAX));
        }
        if files > 0 {
            self.ledger.charge(BudgetKind::Files, files);
        }
        if lines > 0 {
            self.ledger.charge(BudgetKind::Lines, lines);
        }
    }
}

/// Distinct paths in submission order, plus the total content line count.
fn batch_accounting(ops: &[ApplyOperation]) -> (Vec<String>, u64) {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    let mut lines: u64 = 0;
    for op in ops {
        if seen.insert(op.path.clone()) {
            files.push(op.path.clone());
        }
        if !op.content.is_empty() {
            lines = lines.saturating_add(u64::try_from(op.content_lines()).unwrap_or(u64::MAX));
        }
    }
    (files, lines)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
