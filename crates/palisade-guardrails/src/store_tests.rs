use super::*;
use crate::budget::BudgetKind;
use crate::policy::Severity;

fn make_policy(id: &str) -> GuardrailPolicy {
    GuardrailPolicy::new(id, format!("Policy {id}"), Severity::Block)
}

fn make_budget(id: &str, limit: u64) -> BudgetPolicy {
    BudgetPolicy::new(id, format!("Budget {id}"), BudgetKind::Files, limit)
}

// ---------------------------------------------------------------------------
// Guardrail policy CRUD
// ---------------------------------------------------------------------------

#[test]
fn test_new_store_is_empty() {
    let store = PolicyStore::new();
    assert!(store.policies().is_empty());
    assert!(store.budgets().is_empty());
}

#[test]
fn test_default_store_is_seeded() {
    let store = PolicyStore::default();
    let policies = store.policies();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].id, "forbidden-paths");
    assert_eq!(store.budgets().len(), 3);
}

#[test]
fn test_add_policy_rejects_duplicate_id() {
    let store = PolicyStore::new();
    store.add_policy(make_policy("p1")).unwrap();

    let err = store.add_policy(make_policy("p1")).unwrap_err();
    assert!(matches!(err, GuardrailError::DuplicatePolicy { id } if id == "p1"));
    assert_eq!(store.policies().len(), 1);
}

#[test]
fn test_update_policy_replaces_in_place() {
    let store = PolicyStore::new();
    store.add_policy(make_policy("p1")).unwrap();
    store.add_policy(make_policy("p2")).unwrap();

    let updated = make_policy("p1").with_enabled(false);
    store.update_policy(updated).unwrap();

    let policies = store.policies();
    assert_eq!(policies[0].id, "p1");
    assert!(!policies[0].enabled);
    assert_eq!(policies[1].id, "p2");
}

#[test]
fn test_update_unknown_policy_fails() {
    let store = PolicyStore::new();
    let err = store.update_policy(make_policy("ghost")).unwrap_err();
    assert!(matches!(err, GuardrailError::PolicyNotFound { id } if id == "ghost"));
}

#[test]
fn test_remove_policy() {
    let store = PolicyStore::new();
    store.add_policy(make_policy("p1")).unwrap();
    store.remove_policy("p1").unwrap();
    assert!(store.policies().is_empty());

    let err = store.remove_policy("p1").unwrap_err();
    assert!(matches!(err, GuardrailError::PolicyNotFound { .. }));
}

#[test]
fn test_snapshot_is_owned() {
    let store = PolicyStore::new();
    store.add_policy(make_policy("p1")).unwrap();

    let snapshot = store.policies();
    store.remove_policy("p1").unwrap();
    // The earlier snapshot is unaffected by later mutation.
    assert_eq!(snapshot.len(), 1);
}

// ---------------------------------------------------------------------------
// Budget policy CRUD
// ---------------------------------------------------------------------------

#[test]
fn test_add_budget_rejects_duplicate_id() {
    let store = PolicyStore::new();
    store.add_budget(make_budget("b1", 10)).unwrap();

    let err = store.add_budget(make_budget("b1", 20)).unwrap_err();
    assert!(matches!(err, GuardrailError::DuplicateBudget { id } if id == "b1"));
}

#[test]
fn test_update_budget() {
    let store = PolicyStore::new();
    store.add_budget(make_budget("b1", 10)).unwrap();
    store.update_budget(make_budget("b1", 99)).unwrap();
    assert_eq!(store.budgets()[0].limit, 99);

    let err = store.update_budget(make_budget("b2", 1)).unwrap_err();
    assert!(matches!(err, GuardrailError::BudgetNotFound { id } if id == "b2"));
}

#[test]
fn test_remove_budget() {
    let store = PolicyStore::new();
    store.add_budget(make_budget("b1", 10)).unwrap();
    store.remove_budget("b1").unwrap();
    assert!(store.budgets().is_empty());

    let err = store.remove_budget("b1").unwrap_err();
    assert!(matches!(err, GuardrailError::BudgetNotFound { .. }));
}
