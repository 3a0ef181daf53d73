//! Palisade Apply - reversible file mutation engine.
//!
//! This crate executes approved file mutations. Each [`ApplyOperation`] names
//! a target path, a strategy, and content; the [`ApplyEngine`] validates it,
//! captures a backup, dispatches to the strategy, and runs best-effort
//! post-processing hooks. Failures of every kind are encoded in the returned
//! [`ApplyResult`] rather than raised, so batch callers always get a result
//! per attempted operation.
//!
//! # Strategies
//!
//! - **Anchor**: insert content at the first line containing an anchor
//!   substring, optionally guarded by a context-window digest that detects a
//!   stale read ([`context_digest`]).
//! - **Full-file**: replace the whole file, creating parent directories.
//! - **Ast** / **Recipe**: declared extension points that currently delegate
//!   to full-file replacement.
//!
//! # Reversibility
//!
//! With backups enabled the engine snapshots each file before mutating it;
//! [`ApplyEngine::rollback_operation`] restores the snapshot and consumes it.
//! The [`BackupStore`] is bounded, and callers that accept an applied change
//! should discard its backup.
//!
//! # Example
//!
//! ```
//! use palisade_apply::{ApplyOperation, EditBatch, OpKind, Strategy};
//!
//! let op = ApplyOperation::new("src/lib.rs", "rust", Strategy::Anchor, OpKind::Modify)
//!     .with_anchor_before("mod tests")
//!     .with_content("pub mod extra;");
//! assert_eq!(op.content_lines(), 1);
//!
//! // Toolchain edit batches convert 1:1 into operations.
//! let batch = EditBatch::from_json(
//!     r#"{"schemaVersion": "1.0", "edits": [
//!         {"id": "e1", "kind": "fullFile", "op": "create",
//!          "path": "src/new.rs", "language": "rust", "content": "pub fn f() {}"}
//!     ]}"#,
//! )
//! .unwrap();
//! assert_eq!(batch.operations().len(), 1);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod backup;
pub mod edits;
pub mod engine;
/// Error types and results for the apply engine.
pub mod error;
pub mod hash;
pub mod operation;
pub mod postprocess;
mod strategy;

pub use backup::{BackupStore, DEFAULT_BACKUP_CAPACITY};
pub use edits::{Edit, EditAnchor, EditBatch, EditMetadata};
pub use engine::{ApplyEngine, ApplyEngineConfig};
pub use error::{ApplyError, EngineResult};
pub use hash::{CONTEXT_LINES, context_digest};
pub use operation::{ApplyOperation, ApplyResult, OpKind, Strategy};
pub use postprocess::{Formatter, ImportFixer};
