//! Apply-engine lifecycle: validate, back up, dispatch, post-process.
//!
//! The engine holds the critical section for a path: validation (including
//! the staleness hash), backup capture, the strategy write, and
//! post-processing all run under that path's lock, so concurrent applies to
//! the same file cannot interleave. Applies to different paths proceed in
//! parallel.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::backup::BackupStore;
use crate::error::{ApplyError, EngineResult};
use crate::hash::context_digest;
use crate::operation::{ApplyOperation, ApplyResult, OpKind, Strategy};
use crate::postprocess::{self, Formatter, ImportFixer};
use crate::strategy;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine configuration.
///
/// Serializes with camelCase keys for the wire; snake_case keys are accepted
/// on input for config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplyEngineConfig {
    /// Run a registered formatter after each successful apply.
    #[serde(alias = "auto_format")]
    pub auto_format: bool,
    /// Run a registered import fixer after each successful apply.
    #[serde(alias = "auto_fix_imports")]
    pub auto_fix_imports: bool,
    /// Capture a backup before each mutation, enabling rollback.
    #[serde(alias = "backup_files")]
    pub backup_files: bool,
    /// Sanity-check the applied file after post-processing.
    #[serde(alias = "validate_after")]
    pub validate_after: bool,
    /// Languages the owning application supports.
    pub languages: Vec<String>,
}

impl Default for ApplyEngineConfig {
    fn default() -> Self {
        Self {
            auto_format: true,
            auto_fix_imports: true,
            backup_files: true,
            validate_after: true,
            languages: vec![
                "rust".to_string(),
                "go".to_string(),
                "typescript".to_string(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Applies mutation operations to files, reversibly.
pub struct ApplyEngine {
    config: RwLock<ApplyEngineConfig>,
    backups: BackupStore,
    formatters: RwLock<HashMap<String, Arc<dyn Formatter>>>,
    import_fixers: RwLock<HashMap<String, Arc<dyn ImportFixer>>>,
    path_locks: DashMap<String, Arc<Mutex<()>>>,
    cancel: CancellationToken,
}

impl fmt::Debug for ApplyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyEngine")
            .field("config", &self.config())
            .field("backups", &self.backups.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ApplyEngine {
    /// Creates an engine with `config`, no registered toolchain hooks, and a
    /// never-cancelled token.
    #[must_use]
    pub fn new(config: ApplyEngineConfig) -> Self {
        Self {
            config: RwLock::new(config),
            backups: BackupStore::default(),
            formatters: RwLock::new(HashMap::new()),
            import_fixers: RwLock::new(HashMap::new()),
            path_locks: DashMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Ties the engine to a cancellation token. New operations fail once the
    /// token fires; post-processing steps are skipped rather than interrupted
    /// midway.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Caps the backup store at `capacity` entries.
    #[must_use]
    pub fn with_backup_capacity(mut self, capacity: usize) -> Self {
        self.backups = BackupStore::new(capacity);
        self
    }

    /// Registers a formatter for a language key.
    pub fn register_formatter(&self, language: impl Into<String>, formatter: Arc<dyn Formatter>) {
        let language = language.into();
        tracing::info!("registered formatter for language: {language}");
        self.write_formatters().insert(language, formatter);
    }

    /// Registers an import fixer for a language key.
    pub fn register_import_fixer(&self, language: impl Into<String>, fixer: Arc<dyn ImportFixer>) {
        let language = language.into();
        tracing::info!("registered import fixer for language: {language}");
        self.write_fixers().insert(language, fixer);
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> ApplyEngineConfig {
        self.read_config().clone()
    }

    /// Replaces the configuration.
    pub fn update_config(&self, config: ApplyEngineConfig) {
        *self.write_config() = config;
        tracing::info!("updated apply engine configuration");
    }

    /// Languages the owning application supports.
    #[must_use]
    pub fn supported_languages(&self) -> Vec<String> {
        self.read_config().languages.clone()
    }

    /// The backup store, for commit-time discards and inspection.
    #[must_use]
    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    // -----------------------------------------------------------------------
    // Apply
    // -----------------------------------------------------------------------

    /// Applies one operation, returning its result.
    ///
    /// Failures of any kind — validation, I/O, semantic — are encoded in the
    /// result; this call itself never fails.
    pub async fn apply_operation(&self, op: &ApplyOperation) -> ApplyResult {
        tracing::info!("applying operation {} to {}", op.id, op.path);

        if self.cancel.is_cancelled() {
            return ApplyResult::failure(op, ApplyError::Cancelled.to_string());
        }

        let lock = self.path_lock(&op.path);
        let result = {
            let _guard = lock.lock().await;
            self.apply_locked(op).await
        };
        drop(lock);
        self.release_path_lock(&op.path);
        result
    }

    async fn apply_locked(&self, op: &ApplyOperation) -> ApplyResult {
        if let Err(e) = self.validate_operation(op).await {
            return ApplyResult::failure(op, e.to_string());
        }

        if self.read_config().backup_files {
            self.record_backup(&op.path).await;
        }

        let outcome = match op.strategy {
            Strategy::Anchor => strategy::apply_anchor(op).await,
            Strategy::FullFile => strategy::apply_full_file(op).await,
            Strategy::Ast | Strategy::Recipe => {
                tracing::debug!("{} strategy delegating to full-file replace", op.strategy);
                strategy::apply_full_file(op).await
            }
        };

        let result = match outcome {
            Ok(result) => result,
            Err(e) => return ApplyResult::failure(op, e.to_string()),
        };

        if result.success {
            self.post_process(op).await;
        }
        result
    }

    /// Applies operations in order, stopping at the first failed result.
    ///
    /// The returned list is equal in length to the input, or shorter when the
    /// batch stopped early; the last entry is then the failure.
    pub async fn apply_operations(&self, ops: &[ApplyOperation]) -> Vec<ApplyResult> {
        let mut results = Vec::with_capacity(ops.len());
        for op in ops {
            let result = self.apply_operation(op).await;
            let failed = !result.success;
            results.push(result);
            if failed {
                break;
            }
        }
        results
    }

    /// Checks an operation's invariants without applying it.
    ///
    /// Required fields must be non-empty; a modify operation's target must
    /// exist; the anchor strategy needs at least one anchor, and a supplied
    /// hash must match the file's current context window.
    pub async fn validate_operation(&self, op: &ApplyOperation) -> EngineResult<()> {
        if op.id.is_empty() {
            return Err(ApplyError::MissingField { field: "ID" });
        }
        if op.path.is_empty() {
            return Err(ApplyError::MissingField { field: "path" });
        }
        if op.language.is_empty() {
            return Err(ApplyError::MissingField { field: "language" });
        }

        if op.operation == OpKind::Modify && fs::metadata(&op.path).await.is_err() {
            return Err(ApplyError::FileMissing {
                path: op.path.clone(),
            });
        }

        if op.strategy == Strategy::Anchor {
            let has_anchor = |anchor: &Option<String>| {
                anchor.as_deref().is_some_and(|a| !a.is_empty())
            };
            if !has_anchor(&op.anchor_before) && !has_anchor(&op.anchor_after) {
                return Err(ApplyError::AnchorMissing);
            }
            if let Some(expected) = op.hash.as_deref().filter(|h| !h.is_empty()) {
                self.check_context_hash(op, expected).await?;
            }
        }

        Ok(())
    }

    /// Restores the file named by `result` from its backup.
    ///
    /// The backup entry is consumed: a second rollback for the same path
    /// fails with [`ApplyError::BackupNotFound`]. Runs under the same
    /// per-path lock as applies.
    pub async fn rollback_operation(&self, result: &ApplyResult) -> EngineResult<()> {
        if !self.read_config().backup_files {
            return Err(ApplyError::BackupsDisabled);
        }

        let lock = self.path_lock(&result.path);
        let outcome = {
            let _guard = lock.lock().await;
            self.rollback_locked(result).await
        };
        drop(lock);
        self.release_path_lock(&result.path);
        outcome
    }

    async fn rollback_locked(&self, result: &ApplyResult) -> EngineResult<()> {
        let backup = self
            .backups
            .get(&result.path)
            .ok_or_else(|| ApplyError::BackupNotFound {
                path: result.path.clone(),
            })?;

        fs::write(&result.path, &backup)
            .await
            .map_err(|source| ApplyError::Write {
                path: result.path.clone(),
                source,
            })?;

        self.backups.discard(&result.path);
        tracing::info!("rolled back operation {} for {}", result.operation_id, result.path);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn check_context_hash(&self, op: &ApplyOperation, expected: &str) -> EngineResult<()> {
        let content = fs::read_to_string(&op.path)
            .await
            .map_err(|source| ApplyError::Read {
                path: op.path.clone(),
                source,
            })?;

        let actual = context_digest(
            &content,
            op.anchor_before.as_deref(),
            op.anchor_after.as_deref(),
        )
        .ok_or(ApplyError::AnchorNotFound)?;

        if actual != expected {
            return Err(ApplyError::HashMismatch {
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }

    async fn record_backup(&self, path: &str) {
        match fs::read_to_string(path).await {
            Ok(content) => self.backups.insert(path, content),
            Err(e) => tracing::warn!("failed to create backup for {path}: {e}"),
        }
    }

    async fn post_process(&self, op: &ApplyOperation) {
        let config = self.read_config().clone();

        if config.auto_format {
            if self.post_process_cancelled(&op.path) {
                return;
            }
            match self.formatter_for(&op.language) {
                Some(formatter) => match formatter.format_file(&op.path).await {
                    Ok(()) => tracing::info!("formatted file: {}", op.path),
                    Err(e) => tracing::warn!("formatting failed for {}: {e}", op.path),
                },
                None => tracing::warn!("no formatter registered for language: {}", op.language),
            }
        }

        if config.auto_fix_imports {
            if self.post_process_cancelled(&op.path) {
                return;
            }
            match self.import_fixer_for(&op.language) {
                Some(fixer) => match fixer.fix_imports(&op.path).await {
                    Ok(()) => tracing::info!("fixed imports in file: {}", op.path),
                    Err(e) => tracing::warn!("import fixing failed for {}: {e}", op.path),
                },
                None => tracing::warn!("no import fixer registered for language: {}", op.language),
            }
        }

        if config.validate_after {
            if self.post_process_cancelled(&op.path) {
                return;
            }
            if let Err(e) = postprocess::validate_applied(op).await {
                tracing::warn!("post-application validation failed for {}: {e}", op.path);
            }
        }
    }

    fn post_process_cancelled(&self, path: &str) -> bool {
        if self.cancel.is_cancelled() {
            tracing::debug!("post-processing cancelled for {path}");
            return true;
        }
        false
    }

    fn formatter_for(&self, language: &str) -> Option<Arc<dyn Formatter>> {
        self.read_formatters().get(language).cloned()
    }

    fn import_fixer_for(&self, language: &str) -> Option<Arc<dyn ImportFixer>> {
        self.read_fixers().get(language).cloned()
    }

    fn path_lock(&self, path: &str) -> Arc<Mutex<()>> {
        self.path_locks
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the lock entry for `path` once no task holds a clone, keeping
    /// the map from accumulating one entry per distinct path touched.
    fn release_path_lock(&self, path: &str) {
        self.path_locks
            .remove_if(path, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn read_config(&self) -> RwLockReadGuard<'_, ApplyEngineConfig> {
        self.config.read().unwrap_or_else(|e| {
            tracing::warn!("apply config lock poisoned; recovering");
            e.into_inner()
        })
    }

    fn write_config(&self) -> RwLockWriteGuard<'_, ApplyEngineConfig> {
        self.config.write().unwrap_or_else(|e| {
            tracing::warn!("apply config lock poisoned; recovering");
            e.into_inner()
        })
    }

    fn read_formatters(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn Formatter>>> {
        self.formatters.read().unwrap_or_else(|e| {
            tracing::warn!("formatter registry lock poisoned; recovering");
            e.into_inner()
        })
    }

    fn write_formatters(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn Formatter>>> {
        self.formatters.write().unwrap_or_else(|e| {
            tracing::warn!("formatter registry lock poisoned; recovering");
            e.into_inner()
        })
    }

    fn read_fixers(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn ImportFixer>>> {
        self.import_fixers.read().unwrap_or_else(|e| {
            tracing::warn!("import fixer registry lock poisoned; recovering");
            e.into_inner()
        })
    }

    fn write_fixers(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn ImportFixer>>> {
        self.import_fixers.write().unwrap_or_else(|e| {
            tracing::warn!("import fixer registry lock poisoned; recovering");
            e.into_inner()
        })
    }
}

impl Default for ApplyEngine {
    /// Engine with the default configuration.
    fn default() -> Self {
        Self::new(ApplyEngineConfig::default())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
