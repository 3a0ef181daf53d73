//! Post-processing hooks and applied-file validation.
//!
//! Formatters and import fixers are external toolchain collaborators
//! registered per language key. The engine treats every post-processing step
//! as best-effort: a failure is logged and the applied mutation stands.

use async_trait::async_trait;
use tokio::fs;

use crate::error::{ApplyError, EngineResult};
use crate::operation::{ApplyOperation, OpKind};

/// Languages that get the comments-only sanity check after apply.
const COMMENT_CHECK_LANGUAGES: [&str; 2] = ["go", "rust"];

/// Formats a file in place after a successful mutation.
#[async_trait]
pub trait Formatter: Send + Sync {
    /// Formats the file at `path`.
    ///
    /// Implementations should be atomic-or-unattempted: on cancellation or
    /// failure, leave the file as the mutation wrote it rather than partially
    /// formatted.
    async fn format_file(&self, path: &str) -> EngineResult<()>;
}

/// Repairs import statements in a file after a successful mutation.
#[async_trait]
pub trait ImportFixer: Send + Sync {
    /// Fixes imports in the file at `path`.
    async fn fix_imports(&self, path: &str) -> EngineResult<()>;
}

/// Sanity-checks the file an operation just produced.
///
/// The file must exist; for non-delete operations it must be non-empty, and
/// for languages with `//` comment syntax it must contain at least one
/// non-comment line.
pub(crate) async fn validate_applied(op: &ApplyOperation) -> EngineResult<()> {
    if fs::metadata(&op.path).await.is_err() {
        return Err(ApplyError::MissingAfterApply {
            path: op.path.clone(),
        });
    }

    if op.operation == OpKind::Delete {
        return Ok(());
    }

    let content = fs::read_to_string(&op.path)
        .await
        .map_err(|source| ApplyError::Read {
            path: op.path.clone(),
            source,
        })?;

    if content.is_empty() {
        return Err(ApplyError::EmptyAfterApply {
            path: op.path.clone(),
        });
    }

    if COMMENT_CHECK_LANGUAGES.contains(&op.language.as_str()) && !has_code(&content) {
        return Err(ApplyError::NoCode {
            path: op.path.clone(),
        });
    }

    Ok(())
}

fn has_code(content: &str) -> bool {
    content.lines().any(|line| {
        let trimmed = line.trim_start();
        !trimmed.is_empty() && !trimmed.starts_with("//") && !trimmed.starts_with("/*")
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
