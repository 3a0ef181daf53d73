//! Anchor-strategy flows: the staleness guard and duplicate insertion.

mod common;

use common::{default_gate, path_in};
use palisade_apply::{ApplyOperation, OpKind, Strategy, context_digest};

#[tokio::test]
async fn test_hash_guarded_edit_applies_when_fresh() -> anyhow::Result<()> {
    let gate = default_gate();
    let dir = tempfile::tempdir()?;
    let path = path_in(&dir, "service.rs");
    let original = "fn init() {}\n// wiring\nfn shutdown() {}\n";
    std::fs::write(&path, original)?;

    let digest = context_digest(original, Some("// wiring"), None).unwrap();
    let op = ApplyOperation::new(&path, "rust", Strategy::Anchor, OpKind::Modify)
        .with_anchor_before("// wiring")
        .with_hash(digest)
        .with_content("fn reload() {}");

    let results = gate.apply_batch("task-10", &[op]).await?;
    assert!(results[0].success);
    assert_eq!(
        std::fs::read_to_string(&path)?,
        "fn init() {}\n// wiring\nfn reload() {}\nfn shutdown() {}\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_stale_hash_fails_without_touching_the_file() -> anyhow::Result<()> {
    let gate = default_gate();
    let dir = tempfile::tempdir()?;
    let path = path_in(&dir, "service.rs");
    let original = "fn init() {}\n// wiring\nfn shutdown() {}\n";
    std::fs::write(&path, original)?;
    let digest = context_digest(original, Some("// wiring"), None).unwrap();

    // Another writer lands inside the context window after the digest was taken.
    let tampered = "fn init() { boot() }\n// wiring\nfn shutdown() {}\n";
    std::fs::write(&path, tampered)?;

    let op = ApplyOperation::new(&path, "rust", Strategy::Anchor, OpKind::Modify)
        .with_anchor_before("// wiring")
        .with_hash(digest)
        .with_content("fn reload() {}");
    let results = gate.apply_batch("task-11", &[op]).await?;

    assert!(!results[0].success);
    assert!(
        results[0]
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("anchor hash mismatch")
    );
    assert_eq!(std::fs::read_to_string(&path)?, tampered, "no partial write");
    Ok(())
}

#[tokio::test]
async fn test_reapplying_the_same_insertion_duplicates_it() -> anyhow::Result<()> {
    let gate = default_gate();
    let dir = tempfile::tempdir()?;
    let path = path_in(&dir, "mod.rs");
    std::fs::write(&path, "// modules\nmod tail;\n")?;

    let op = ApplyOperation::new(&path, "rust", Strategy::Anchor, OpKind::Modify)
        .with_anchor_before("// modules")
        .with_content("mod extra;");

    let first = gate.apply_batch("task-12", std::slice::from_ref(&op)).await?;
    assert!(first[0].success);
    let second = gate.apply_batch("task-12", std::slice::from_ref(&op)).await?;
    assert!(second[0].success, "insertion is not idempotent");

    assert_eq!(
        std::fs::read_to_string(&path)?,
        "// modules\nmod extra;\nmod extra;\nmod tail;\n"
    );
    Ok(())
}
