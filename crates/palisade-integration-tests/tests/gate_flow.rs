//! End-to-end batch flows through the mutation gate.

mod common;

use common::{create_op, default_gate, modify_op, path_in};
use palisade_apply::EditBatch;
use palisade_gate::GateError;
use palisade_guardrails::{BudgetKind, Severity};

#[tokio::test]
async fn test_approved_batch_applies_then_rolls_back() -> anyhow::Result<()> {
    let gate = default_gate();
    let dir = tempfile::tempdir()?;
    let first = path_in(&dir, "alpha.rs");
    let second = path_in(&dir, "beta.rs");
    std::fs::write(&first, "fn alpha() {}\n")?;
    std::fs::write(&second, "fn beta() {}\n")?;

    let results = gate
        .apply_batch(
            "task-1",
            &[
                modify_op(&first, "fn alpha() { run() }\n"),
                modify_op(&second, "fn beta() { run() }\n"),
            ],
        )
        .await?;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(std::fs::read_to_string(&first)?, "fn alpha() { run() }\n");

    gate.rollback(&results).await?;
    assert_eq!(std::fs::read_to_string(&first)?, "fn alpha() {}\n");
    assert_eq!(std::fs::read_to_string(&second)?, "fn beta() {}\n");
    Ok(())
}

#[tokio::test]
async fn test_batch_stops_at_the_first_failed_operation() {
    let gate = default_gate();
    let dir = tempfile::tempdir().unwrap();
    let first = path_in(&dir, "one.rs");
    let missing = path_in(&dir, "missing.rs");
    let never = path_in(&dir, "never.rs");

    let ops = [
        create_op(&first, "fn one() {}"),
        modify_op(&missing, "fn nope() {}"),
        create_op(&never, "fn never() {}"),
    ];
    let results = gate.apply_batch("task-2", &ops).await.unwrap();

    assert_eq!(results.len(), 2, "the failed result ends the batch");
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(
        results[1]
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("does not exist")
    );
    assert!(!std::path::Path::new(&never).exists());
}

#[tokio::test]
async fn test_edit_batch_document_round_trips() -> anyhow::Result<()> {
    let gate = default_gate();
    let dir = tempfile::tempdir()?;
    let lib = path_in(&dir, "lib.rs");
    std::fs::write(&lib, "mod a;\nmod z;\n")?;
    let fresh = path_in(&dir, "b.rs");

    let document = serde_json::json!({
        "schemaVersion": "1.0",
        "metadata": { "taskId": "task-3", "reason": "add module" },
        "edits": [
            {
                "id": "e1",
                "kind": "anchorPatch",
                "op": "modify",
                "path": lib,
                "language": "rust",
                "content": "mod b;",
                "anchor": { "before": "mod a;" }
            },
            {
                "id": "e2",
                "kind": "fullFile",
                "op": "create",
                "path": fresh,
                "language": "rust",
                "content": "pub fn b() {}\n"
            }
        ]
    });
    let batch = EditBatch::from_json(&document.to_string())?;

    let results = gate.apply_edit_batch(&batch).await?;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(std::fs::read_to_string(&lib)?, "mod a;\nmod b;\nmod z;\n");
    assert_eq!(std::fs::read_to_string(&fresh)?, "pub fn b() {}\n");
    Ok(())
}

#[tokio::test]
async fn test_rejected_batch_touches_nothing() {
    let gate = default_gate();
    let dir = tempfile::tempdir().unwrap();
    let safe = path_in(&dir, "safe.rs");
    let lockfile = path_in(&dir, "package-lock.json");

    let err = gate
        .apply_batch(
            "task-4",
            &[create_op(&safe, "fn safe() {}"), create_op(&lockfile, "{}")],
        )
        .await
        .unwrap_err();

    match err {
        GateError::Rejected { reason, report } => {
            assert!(reason.contains("guardrail violation"), "reason: {reason}");
            assert_eq!(report.task_id, "task-4");
            assert!(report.violations.iter().any(|v| v.severity == Severity::Block));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(
        !std::path::Path::new(&safe).exists(),
        "validation precedes every apply"
    );
}

#[tokio::test]
async fn test_ledger_accumulates_across_batches() -> anyhow::Result<()> {
    let gate = default_gate();
    let dir = tempfile::tempdir()?;

    gate.apply_batch("task-5", &[create_op(&path_in(&dir, "a.rs"), "fn a() {}")])
        .await?;
    gate.apply_batch(
        "task-5",
        &[create_op(&path_in(&dir, "b.rs"), "fn b() {}\nfn c() {}")],
    )
    .await?;

    assert_eq!(gate.ledger().usage(BudgetKind::Files), 2);
    assert_eq!(gate.ledger().usage(BudgetKind::Lines), 3);
    Ok(())
}
