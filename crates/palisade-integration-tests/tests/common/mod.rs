//! Shared helpers for gate integration tests.

use std::sync::Once;

use palisade_apply::{ApplyOperation, OpKind, Strategy};
use palisade_gate::{MutationGate, PalisadeConfig};
use tempfile::TempDir;

static TRACING: Once = Once::new();

/// Initializes a per-process test subscriber, filtered by `RUST_LOG`.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A gate over the built-in policies with default configuration.
#[allow(dead_code)]
pub fn default_gate() -> MutationGate {
    init_tracing();
    MutationGate::from_config(PalisadeConfig::default())
}

/// The string form of `name` inside `dir`, as the engine takes paths.
#[allow(dead_code)]
pub fn path_in(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).display().to_string()
}

/// A full-file create writing `content` to `path`.
#[allow(dead_code)]
pub fn create_op(path: &str, content: &str) -> ApplyOperation {
    ApplyOperation::new(path, "rust", Strategy::FullFile, OpKind::Create).with_content(content)
}

/// A full-file modify replacing `path` with `content`.
#[allow(dead_code)]
pub fn modify_op(path: &str, content: &str) -> ApplyOperation {
    ApplyOperation::new(path, "rust", Strategy::FullFile, OpKind::Modify).with_content(content)
}
