//! Apply-engine error types.

use thiserror::Error;

/// Errors produced while validating, applying, or rolling back a mutation.
///
/// Operation-level failures never escape [`apply_operation`] as errors — they
/// are stringified into the failure [`ApplyResult`]. This enum surfaces
/// directly from [`validate_operation`] and [`rollback_operation`], and from
/// the extension-point traits.
///
/// [`apply_operation`]: crate::ApplyEngine::apply_operation
/// [`validate_operation`]: crate::ApplyEngine::validate_operation
/// [`rollback_operation`]: crate::ApplyEngine::rollback_operation
/// [`ApplyResult`]: crate::ApplyResult
#[derive(Debug, Error)]
pub enum ApplyError {
    /// A required operation field was empty.
    #[error("operation {field} is required")]
    MissingField {
        /// Name of the empty field.
        field: &'static str,
    },

    /// A modify operation targets a file that does not exist.
    #[error("file does not exist: {path}")]
    FileMissing {
        /// The missing file.
        path: String,
    },

    /// The anchor strategy was selected without any anchor string.
    #[error("at least one anchor is required for anchor strategy")]
    AnchorMissing,

    /// Neither anchor substring occurs in the target file.
    #[error("anchor not found in file")]
    AnchorNotFound,

    /// The supplied context-window digest does not match the file.
    #[error("anchor hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Digest the caller computed when it read the file.
        expected: String,
        /// Digest of the file as it is now.
        actual: String,
    },

    /// Rollback requested while backups are disabled.
    #[error("backup not available")]
    BackupsDisabled,

    /// No backup entry recorded for the path.
    #[error("backup not found for {path}")]
    BackupNotFound {
        /// Path with no backup.
        path: String,
    },

    /// The operation was cancelled before it ran.
    #[error("operation cancelled")]
    Cancelled,

    /// Reading the target file failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File being read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Writing the target file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File being written.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Creating a parent directory failed.
    #[error("failed to create directory {dir}: {source}")]
    CreateDir {
        /// Directory being created.
        dir: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file vanished between apply and post-validation.
    #[error("file does not exist after application: {path}")]
    MissingAfterApply {
        /// File that disappeared.
        path: String,
    },

    /// The file is empty after a non-delete operation.
    #[error("file is empty after application: {path}")]
    EmptyAfterApply {
        /// Empty file.
        path: String,
    },

    /// The file contains only comments after application.
    #[error("file contains no code: {path}")]
    NoCode {
        /// File with no code lines.
        path: String,
    },

    /// An external formatter or import fixer reported a failure.
    #[error("post-processing failed: {0}")]
    PostProcess(String),

    /// An edit batch could not be parsed.
    #[error("invalid edit batch: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for apply-engine operations.
pub type EngineResult<T> = Result<T, ApplyError>;
