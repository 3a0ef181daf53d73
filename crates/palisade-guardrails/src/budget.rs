//! Budget policies and the windowed usage ledger.
//!
//! A [`BudgetPolicy`] caps one resource kind (files, lines, or tokens) at a
//! limit per time window. The validator compares a caller-supplied running
//! count against the limit; the [`BudgetLedger`] is an optional helper for
//! callers that need to maintain that running count across batches.

use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default budget window: one rolling hour.
pub const DEFAULT_TIME_WINDOW_SECS: u64 = 3600;

// ---------------------------------------------------------------------------
// Policy types
// ---------------------------------------------------------------------------

/// Resource dimension a budget constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetKind {
    /// Files changed.
    Files,
    /// Lines changed.
    Lines,
    /// Tokens consumed.
    Tokens,
}

impl fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Files => write!(f, "files"),
            Self::Lines => write!(f, "lines"),
            Self::Tokens => write!(f, "tokens"),
        }
    }
}

/// Unit a budget limit is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetUnit {
    /// A plain count.
    Count,
}

impl fmt::Display for BudgetUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count => write!(f, "count"),
        }
    }
}

/// A capped, time-windowed resource budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetPolicy {
    /// Budget identifier, unique within a store.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What the budget protects against.
    pub description: String,
    /// Resource kind the limit applies to.
    pub kind: BudgetKind,
    /// Maximum usage per window.
    pub limit: u64,
    /// Unit of the limit.
    pub unit: BudgetUnit,
    /// Window length in seconds.
    pub time_window_secs: u64,
    /// Disabled budgets never produce violations.
    pub enabled: bool,
}

impl BudgetPolicy {
    /// Creates an enabled budget with the default one-hour window.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: BudgetKind, limit: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            kind,
            limit,
            unit: BudgetUnit::Count,
            time_window_secs: DEFAULT_TIME_WINDOW_SECS,
            enabled: true,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the window length.
    #[must_use]
    pub fn with_time_window(mut self, window: Duration) -> Self {
        self.time_window_secs = window.as_secs();
        self
    }

    /// Sets the enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Window length as a [`Duration`].
    #[must_use]
    pub fn time_window(&self) -> Duration {
        Duration::from_secs(self.time_window_secs)
    }

    /// The bootstrapped budgets: 150 files, 1500 lines, and 10000 tokens per
    /// rolling hour.
    #[must_use]
    pub fn builtin_budgets() -> Vec<Self> {
        vec![
            Self::new("max-files", "Maximum Files", BudgetKind::Files, 150)
                .with_description("Maximum number of files changed"),
            Self::new("max-lines", "Maximum Lines", BudgetKind::Lines, 1500)
                .with_description("Maximum number of lines changed"),
            Self::new("max-tokens", "Maximum Tokens", BudgetKind::Tokens, 10_000)
                .with_description("Maximum number of tokens per request"),
        ]
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct LedgerSlot {
    consumed: u64,
    window_started: DateTime<Utc>,
}

/// Windowed usage counter.
///
/// Each resource kind accumulates independently and resets once the window
/// has elapsed since its first charge. The ledger only counts — enforcement
/// stays with [`validate_budget`](crate::GuardrailValidator::validate_budget).
#[derive(Debug)]
pub struct BudgetLedger {
    window: chrono::Duration,
    slots: RwLock<HashMap<BudgetKind, LedgerSlot>>,
}

impl BudgetLedger {
    /// Creates a ledger whose kinds reset after `window`.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window: chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX),
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Adds `amount` to `kind`, returning the new in-window total.
    ///
    /// An elapsed window resets the count before charging.
    pub fn charge(&self, kind: BudgetKind, amount: u64) -> u64 {
        let now = Utc::now();
        let mut slots = self.write();
        let slot = slots.entry(kind).or_insert(LedgerSlot {
            consumed: 0,
            window_started: now,
        });
        if now.signed_duration_since(slot.window_started) >= self.window {
            slot.consumed = 0;
            slot.window_started = now;
        }
        slot.consumed = slot.consumed.saturating_add(amount);
        slot.consumed
    }

    /// The in-window total for `kind`; an elapsed window reads as zero.
    #[must_use]
    pub fn usage(&self, kind: BudgetKind) -> u64 {
        let now = Utc::now();
        self.read().get(&kind).map_or(0, |slot| {
            if now.signed_duration_since(slot.window_started) >= self.window {
                0
            } else {
                slot.consumed
            }
        })
    }

    /// Clears `kind` back to zero.
    pub fn reset(&self, kind: BudgetKind) {
        self.write().remove(&kind);
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<BudgetKind, LedgerSlot>> {
        self.slots.read().unwrap_or_else(|e| {
            tracing::warn!("budget ledger lock poisoned; recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<BudgetKind, LedgerSlot>> {
        self.slots.write().unwrap_or_else(|e| {
            tracing::warn!("budget ledger lock poisoned; recovering");
            e.into_inner()
        })
    }
}

impl Default for BudgetLedger {
    /// Ledger with the default one-hour window.
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIME_WINDOW_SECS))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
