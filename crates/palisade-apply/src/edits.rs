//! Versioned edit-batch document produced by external toolchains.
//!
//! A batch is an ordered list of edits plus provenance metadata. Each edit
//! converts 1:1 into an [`ApplyOperation`]; the batch's order is the apply
//! order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineResult;
use crate::operation::{ApplyOperation, OpKind, Strategy};

/// Anchor location carried by an anchor-strategy edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditAnchor {
    /// Insert after the first line containing this substring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Insert before the first line containing this substring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    /// Expected context-window digest at apply time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// One edit within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edit {
    /// Edit identifier, carried into the operation and its result.
    pub id: String,
    /// Mutation strategy; accepts the legacy `anchorPatch` spelling.
    pub kind: Strategy,
    /// Operation kind.
    pub op: OpKind,
    /// Target file path.
    pub path: String,
    /// Language key for post-processing hooks.
    pub language: String,
    /// Content to insert or write.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Anchor location for anchor-strategy edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<EditAnchor>,
    /// Free-form toolchain metadata, passed through untouched.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl Edit {
    /// Converts this edit into the operation the engine executes.
    #[must_use]
    pub fn to_operation(&self) -> ApplyOperation {
        let mut op = ApplyOperation::new(&self.path, &self.language, self.kind, self.op)
            .with_id(&self.id)
            .with_content(&self.content);

        if let Some(anchor) = &self.anchor {
            if let Some(before) = &anchor.before {
                op = op.with_anchor_before(before);
            }
            if let Some(after) = &anchor.after {
                op = op.with_anchor_after(after);
            }
            if let Some(hash) = &anchor.hash {
                op = op.with_hash(hash);
            }
        }

        op.metadata = self.metadata.clone();
        op
    }
}

/// Provenance metadata attached to a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditMetadata {
    /// Why the toolchain produced these edits.
    pub reason: String,
    /// Task the edits belong to.
    pub task_id: String,
    /// Pipeline step that produced them.
    pub step_id: String,
    /// Toolchain's confidence in the batch, 0.0 to 1.0.
    pub confidence: f64,
    /// Toolchain's impact estimate.
    pub estimated_impact: String,
}

/// An ordered, versioned document of edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditBatch {
    /// Document schema version.
    pub schema_version: String,
    /// Version of the toolchain that produced the batch.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub toolchain_version: String,
    /// Batch provenance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EditMetadata>,
    /// Edits in apply order.
    pub edits: Vec<Edit>,
}

impl EditBatch {
    /// Parses a batch from its JSON document form.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts every edit into an operation, preserving order.
    #[must_use]
    pub fn operations(&self) -> Vec<ApplyOperation> {
        self.edits.iter().map(Edit::to_operation).collect()
    }

    /// The task id from the batch metadata, if present and non-empty.
    #[must_use]
    pub fn task_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .map(|m| m.task_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
