//! Anchor and full-file mutation strategies.
//!
//! Both return `Ok` with a failure [`ApplyResult`] for semantic failures
//! (anchor not found, no-op edit) and `Err` only for I/O problems; the engine
//! folds either into the result it hands back.
//!
//! The anchor strategy is not idempotent: re-applying an operation whose
//! anchors still match inserts the content again. Callers that need
//! exactly-once behavior should carry the staleness hash, which changes with
//! the first insertion.

use std::path::Path;

use tokio::fs;

use crate::error::{ApplyError, EngineResult};
use crate::operation::{ApplyOperation, ApplyResult};

/// Inserts the operation's content at its anchor lines.
///
/// The first line containing `anchor_before` gets the content inserted
/// immediately after it; the first line containing `anchor_after` gets it
/// inserted immediately before. Both anchors may fire on one operation. Later
/// occurrences of an anchor substring are ignored. An empty payload inserts
/// nothing and fails with "no changes applied".
pub(crate) async fn apply_anchor(op: &ApplyOperation) -> EngineResult<ApplyResult> {
    let original = fs::read_to_string(&op.path)
        .await
        .map_err(|source| ApplyError::Read {
            path: op.path.clone(),
            source,
        })?;

    let lines: Vec<&str> = original.split('\n').collect();
    let first_match = |anchor: &Option<String>| {
        anchor
            .as_deref()
            .filter(|a| !a.is_empty())
            .and_then(|a| lines.iter().position(|line| line.contains(a)))
    };
    let before_index = first_match(&op.anchor_before);
    let after_index = first_match(&op.anchor_after);

    if before_index.is_none() && after_index.is_none() {
        return Ok(ApplyResult::failure(op, "anchor not found in file"));
    }

    // An empty payload contributes no lines, leaving the content untouched;
    // the identity check below then reports the no-op.
    let insert: Vec<&str> = if op.content.is_empty() {
        Vec::new()
    } else {
        op.content.split('\n').collect()
    };
    let mut updated: Vec<&str> = Vec::with_capacity(lines.len().saturating_add(insert.len()));
    for (i, line) in lines.iter().copied().enumerate() {
        if Some(i) == after_index {
            updated.extend_from_slice(&insert);
        }
        updated.push(line);
        if Some(i) == before_index {
            updated.extend_from_slice(&insert);
        }
    }

    let updated = updated.join("\n");
    if updated == original {
        return Ok(ApplyResult::failure(op, "no changes applied"));
    }

    fs::write(&op.path, &updated)
        .await
        .map_err(|source| ApplyError::Write {
            path: op.path.clone(),
            source,
        })?;

    Ok(ApplyResult::success(op, op.content_lines()))
}

/// Replaces the whole file with the operation's content, creating parent
/// directories as needed.
pub(crate) async fn apply_full_file(op: &ApplyOperation) -> EngineResult<ApplyResult> {
    if let Some(parent) = Path::new(&op.path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| ApplyError::CreateDir {
                    dir: parent.display().to_string(),
                    source,
                })?;
        }
    }

    fs::write(&op.path, &op.content)
        .await
        .map_err(|source| ApplyError::Write {
            path: op.path.clone(),
            source,
        })?;

    Ok(ApplyResult::success(op, op.content_lines()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
