//! Mutation request and result records.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How an operation's content is applied to the target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// Insert content at a line located by anchor substrings.
    ///
    /// Accepts the legacy `anchorPatch` spelling used by edit batches.
    #[serde(alias = "anchorPatch")]
    Anchor,
    /// Replace the whole file, creating parent directories as needed.
    FullFile,
    /// Extension point; currently delegates to [`Strategy::FullFile`].
    Ast,
    /// Extension point; currently delegates to [`Strategy::FullFile`].
    Recipe,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anchor => write!(f, "anchor"),
            Self::FullFile => write!(f, "fullFile"),
            Self::Ast => write!(f, "ast"),
            Self::Recipe => write!(f, "recipe"),
        }
    }
}

/// What the operation does to the target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    /// Create a new file.
    Create,
    /// Change an existing file; the target must already exist.
    Modify,
    /// Remove a file.
    Delete,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Modify => write!(f, "modify"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A single requested file mutation.
///
/// `id`, `path`, and `language` must be non-empty; the anchor strategy
/// additionally requires at least one of `anchor_before` / `anchor_after`.
/// [`validate_operation`](crate::ApplyEngine::validate_operation) enforces
/// these invariants before anything touches the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOperation {
    /// Operation identifier, echoed into the result.
    pub id: String,
    /// Target file path.
    pub path: String,
    /// Language key used to look up post-processing hooks.
    pub language: String,
    /// Mutation strategy.
    pub strategy: Strategy,
    /// Operation kind.
    pub operation: OpKind,
    /// Content to insert or write.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Insert content immediately after the first line containing this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_before: Option<String>,
    /// Insert content immediately before the first line containing this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_after: Option<String>,
    /// Expected digest of the anchor's context window, checked before apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Free-form caller metadata, passed through untouched.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl ApplyOperation {
    /// Creates an operation with a generated id and no content or anchors.
    pub fn new(
        path: impl Into<String>,
        language: impl Into<String>,
        strategy: Strategy,
        operation: OpKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            path: path.into(),
            language: language.into(),
            strategy,
            operation,
            content: String::new(),
            anchor_before: None,
            anchor_after: None,
            hash: None,
            metadata: HashMap::new(),
        }
    }

    /// Sets the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Sets the before-anchor.
    #[must_use]
    pub fn with_anchor_before(mut self, anchor: impl Into<String>) -> Self {
        self.anchor_before = Some(anchor.into());
        self
    }

    /// Sets the after-anchor.
    #[must_use]
    pub fn with_anchor_after(mut self, anchor: impl Into<String>) -> Self {
        self.anchor_after = Some(anchor.into());
        self
    }

    /// Sets the expected context-window digest.
    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Attaches one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Number of lines in the operation's content.
    #[must_use]
    pub fn content_lines(&self) -> usize {
        self.content.split('\n').count()
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Outcome of one [`ApplyOperation`], produced exactly once per attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    /// Whether the mutation was applied.
    pub success: bool,
    /// Target path, echoed from the operation.
    pub path: String,
    /// Identifier of the operation that produced this result.
    pub operation_id: String,
    /// Failure reason when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Content lines applied on success.
    pub applied_lines: usize,
}

impl ApplyResult {
    /// A successful result for `op`.
    #[must_use]
    pub fn success(op: &ApplyOperation, applied_lines: usize) -> Self {
        Self {
            success: true,
            path: op.path.clone(),
            operation_id: op.id.clone(),
            error: None,
            applied_lines,
        }
    }

    /// A failed result for `op` carrying `error`.
    #[must_use]
    pub fn failure(op: &ApplyOperation, error: impl Into<String>) -> Self {
        Self {
            success: false,
            path: op.path.clone(),
            operation_id: op.id.clone(),
            error: Some(error.into()),
            applied_lines: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_builder() {
        let op = ApplyOperation::new("src/lib.rs", "rust", Strategy::Anchor, OpKind::Modify)
            .with_content("use std::fmt;")
            .with_anchor_before("mod tests")
            .with_hash("abc123");

        assert!(!op.id.is_empty());
        assert_eq!(op.path, "src/lib.rs");
        assert_eq!(op.anchor_before.as_deref(), Some("mod tests"));
        assert_eq!(op.anchor_after, None);
        assert_eq!(op.hash.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_content_lines_counts_split_lines() {
        let op = ApplyOperation::new("f", "rust", Strategy::FullFile, OpKind::Create)
            .with_content("a\nb\nc");
        assert_eq!(op.content_lines(), 3);

        // A trailing newline counts as an extra empty line.
        let op = op.with_content("a\n");
        assert_eq!(op.content_lines(), 2);

        let op = op.with_content("");
        assert_eq!(op.content_lines(), 1);
    }

    #[test]
    fn test_strategy_wire_names() {
        assert_eq!(serde_json::to_string(&Strategy::FullFile).unwrap(), "\"fullFile\"");
        assert_eq!(serde_json::to_string(&Strategy::Anchor).unwrap(), "\"anchor\"");
        // Legacy edit-batch spelling deserializes to the anchor strategy.
        let legacy: Strategy = serde_json::from_str("\"anchorPatch\"").unwrap();
        assert_eq!(legacy, Strategy::Anchor);
    }

    #[test]
    fn test_operation_round_trips_as_camel_case() {
        let op = ApplyOperation::new("a.rs", "rust", Strategy::Anchor, OpKind::Modify)
            .with_content("x")
            .with_anchor_after("marker");
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"anchorAfter\":\"marker\""));
        assert!(!json.contains("anchorBefore"), "unset fields are omitted");

        let back: ApplyOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.anchor_after.as_deref(), Some("marker"));
        assert_eq!(back.operation, OpKind::Modify);
    }

    #[test]
    fn test_result_constructors() {
        let op = ApplyOperation::new("f.rs", "rust", Strategy::FullFile, OpKind::Create);

        let ok = ApplyResult::success(&op, 12);
        assert!(ok.success);
        assert_eq!(ok.operation_id, op.id);
        assert_eq!(ok.applied_lines, 12);
        assert_eq!(ok.error, None);

        let failed = ApplyResult::failure(&op, "anchor not found in file");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("anchor not found in file"));
        assert_eq!(failed.applied_lines, 0);
    }
}
