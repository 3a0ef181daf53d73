//! Context-window digest for the anchor staleness guard.
//!
//! The digest covers a bounded window of lines around the first line that
//! contains either anchor substring. Callers compute it when they read the
//! file, attach it to the operation, and the engine recomputes it immediately
//! before applying: a mismatch means the window changed in between. Later
//! occurrences of the anchor text are deliberately ignored — the window is
//! anchored to the first match only, matching where the anchor strategy
//! inserts.

use sha2::{Digest, Sha256};

/// Lines of context hashed on each side of the anchor line.
pub const CONTEXT_LINES: usize = 5;

/// SHA-256 hex digest of the context window around the first anchor match.
///
/// Returns `None` when neither anchor occurs in `content`. Anchors that are
/// `None` or empty are not matched against.
#[must_use]
pub fn context_digest(
    content: &str,
    anchor_before: Option<&str>,
    anchor_after: Option<&str>,
) -> Option<String> {
    let lines: Vec<&str> = content.split('\n').collect();
    let index = first_anchor_line(&lines, anchor_before, anchor_after)?;

    let start = index.saturating_sub(CONTEXT_LINES);
    let end = index
        .saturating_add(CONTEXT_LINES)
        .saturating_add(1)
        .min(lines.len());
    let window = lines.get(start..end)?.join("\n");

    let mut hasher = Sha256::new();
    hasher.update(window.as_bytes());
    Some(hex::encode(hasher.finalize()))
}

/// Index of the first line containing either anchor substring.
pub(crate) fn first_anchor_line(
    lines: &[&str],
    anchor_before: Option<&str>,
    anchor_after: Option<&str>,
) -> Option<usize> {
    let matches = |line: &str| {
        let hit = |anchor: Option<&str>| anchor.is_some_and(|a| !a.is_empty() && line.contains(a));
        hit(anchor_before) || hit(anchor_after)
    };
    lines.iter().position(|line| matches(line))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
