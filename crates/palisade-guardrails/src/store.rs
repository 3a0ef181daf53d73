//! In-memory policy and budget store.
//!
//! The store owns the reader/writer locks for both tables. Validators hold an
//! `Arc<PolicyStore>` and read snapshots; administrative callers use the CRUD
//! surface. [`PolicyStore::default`] seeds the built-in policy set,
//! [`PolicyStore::new`] starts empty.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::budget::BudgetPolicy;
use crate::error::{GuardrailError, GuardrailResult};
use crate::policy::GuardrailPolicy;

/// Shared, lock-guarded collection of guardrail and budget policies.
#[derive(Debug)]
pub struct PolicyStore {
    policies: RwLock<Vec<GuardrailPolicy>>,
    budgets: RwLock<Vec<BudgetPolicy>>,
}

impl PolicyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(Vec::new()),
            budgets: RwLock::new(Vec::new()),
        }
    }

    // -----------------------------------------------------------------------
    // Guardrail policies
    // -----------------------------------------------------------------------

    /// Snapshot of all guardrail policies, in registration order.
    #[must_use]
    pub fn policies(&self) -> Vec<GuardrailPolicy> {
        self.read_policies().clone()
    }

    /// Registers a policy; the ID must be unused.
    pub fn add_policy(&self, policy: GuardrailPolicy) -> GuardrailResult<()> {
        let mut policies = self.write_policies();
        if policies.iter().any(|p| p.id == policy.id) {
            return Err(GuardrailError::DuplicatePolicy { id: policy.id });
        }
        tracing::info!("added guardrail policy: {}", policy.name);
        policies.push(policy);
        Ok(())
    }

    /// Replaces the policy with the same ID.
    pub fn update_policy(&self, policy: GuardrailPolicy) -> GuardrailResult<()> {
        let mut policies = self.write_policies();
        match policies.iter_mut().find(|p| p.id == policy.id) {
            Some(existing) => {
                tracing::info!("updated guardrail policy: {}", policy.name);
                *existing = policy;
                Ok(())
            }
            None => Err(GuardrailError::PolicyNotFound { id: policy.id }),
        }
    }

    /// Removes the policy with `id`.
    pub fn remove_policy(&self, id: &str) -> GuardrailResult<()> {
        let mut policies = self.write_policies();
        match policies.iter().position(|p| p.id == id) {
            Some(index) => {
                let removed = policies.remove(index);
                tracing::info!("removed guardrail policy: {}", removed.name);
                Ok(())
            }
            None => Err(GuardrailError::PolicyNotFound { id: id.to_string() }),
        }
    }

    // -----------------------------------------------------------------------
    // Budget policies
    // -----------------------------------------------------------------------

    /// Snapshot of all budget policies, in registration order.
    #[must_use]
    pub fn budgets(&self) -> Vec<BudgetPolicy> {
        self.read_budgets().clone()
    }

    /// Registers a budget policy; the ID must be unused.
    pub fn add_budget(&self, budget: BudgetPolicy) -> GuardrailResult<()> {
        let mut budgets = self.write_budgets();
        if budgets.iter().any(|b| b.id == budget.id) {
            return Err(GuardrailError::DuplicateBudget { id: budget.id });
        }
        tracing::info!("added budget policy: {}", budget.name);
        budgets.push(budget);
        Ok(())
    }

    /// Replaces the budget policy with the same ID.
    pub fn update_budget(&self, budget: BudgetPolicy) -> GuardrailResult<()> {
        let mut budgets = self.write_budgets();
        match budgets.iter_mut().find(|b| b.id == budget.id) {
            Some(existing) => {
                tracing::info!("updated budget policy: {}", budget.name);
                *existing = budget;
                Ok(())
            }
            None => Err(GuardrailError::BudgetNotFound { id: budget.id }),
        }
    }

    /// Removes the budget policy with `id`.
    pub fn remove_budget(&self, id: &str) -> GuardrailResult<()> {
        let mut budgets = self.write_budgets();
        match budgets.iter().position(|b| b.id == id) {
            Some(index) => {
                let removed = budgets.remove(index);
                tracing::info!("removed budget policy: {}", removed.name);
                Ok(())
            }
            None => Err(GuardrailError::BudgetNotFound { id: id.to_string() }),
        }
    }

    // -----------------------------------------------------------------------
    // Lock helpers
    // -----------------------------------------------------------------------

    fn read_policies(&self) -> RwLockReadGuard<'_, Vec<GuardrailPolicy>> {
        self.policies.read().unwrap_or_else(|e| {
            tracing::warn!("policy table lock poisoned; recovering");
            e.into_inner()
        })
    }

    fn write_policies(&self) -> RwLockWriteGuard<'_, Vec<GuardrailPolicy>> {
        self.policies.write().unwrap_or_else(|e| {
            tracing::warn!("policy table lock poisoned; recovering");
            e.into_inner()
        })
    }

    fn read_budgets(&self) -> RwLockReadGuard<'_, Vec<BudgetPolicy>> {
        self.budgets.read().unwrap_or_else(|e| {
            tracing::warn!("budget table lock poisoned; recovering");
            e.into_inner()
        })
    }

    fn write_budgets(&self) -> RwLockWriteGuard<'_, Vec<BudgetPolicy>> {
        self.budgets.write().unwrap_or_else(|e| {
            tracing::warn!("budget table lock poisoned; recovering");
            e.into_inner()
        })
    }
}

impl Default for PolicyStore {
    /// Store seeded with [`GuardrailPolicy::builtin_forbidden_paths`] and
    /// [`BudgetPolicy::builtin_budgets`].
    fn default() -> Self {
        tracing::info!("initialized default guardrail policies");
        Self {
            policies: RwLock::new(vec![GuardrailPolicy::builtin_forbidden_paths()]),
            budgets: RwLock::new(BudgetPolicy::builtin_budgets()),
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
