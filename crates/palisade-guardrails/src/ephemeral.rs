//! Time-boxed bypass for critical manifest and lockfile paths.
//!
//! Ephemeral mode lets scaffold and dependency-fix tasks touch paths that the
//! forbidden-path policies would otherwise block: package manifests and
//! lockfiles. It is deliberately narrow — a fixed allow-list of task kinds, a
//! fixed set of critical path patterns, and a hard expiry enforced lazily by
//! [`EphemeralMode::tick`] at the top of every validation call.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{GuardrailError, GuardrailResult};
use crate::policy::pattern_matches;

/// Task kinds allowed to enable ephemeral mode.
pub const ALLOWED_TASK_KINDS: [&str; 2] = ["scaffold", "deps_fix"];

/// Manifest and lockfile patterns the bypass applies to.
const CRITICAL_PATH_PATTERNS: [&str; 5] = [
    "go\\.mod",
    "package\\.json",
    "package-lock\\.json",
    "yarn\\.lock",
    "pnpm-lock\\.yaml",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Disabled,
    Enabled { expires_at: DateTime<Utc> },
}

/// Snapshot of the ephemeral state for callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EphemeralStatus {
    /// Whether the bypass is currently active.
    pub active: bool,
    /// Expiry of an active bypass.
    pub expires_at: Option<DateTime<Utc>>,
}

/// The ephemeral-mode state machine: `Disabled` or `Enabled(expiry)`.
///
/// All transitions go through [`enable`](Self::enable),
/// [`disable`](Self::disable), and the lazy expiry in [`tick`](Self::tick).
#[derive(Debug)]
pub struct EphemeralMode {
    state: RwLock<State>,
}

impl EphemeralMode {
    /// Starts disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::Disabled),
        }
    }

    /// Enables the bypass for `ttl`.
    ///
    /// Task kinds outside [`ALLOWED_TASK_KINDS`] are rejected and the current
    /// state is left untouched.
    pub fn enable(&self, task_id: &str, task_kind: &str, ttl: Duration) -> GuardrailResult<()> {
        if !ALLOWED_TASK_KINDS.contains(&task_kind) {
            return Err(GuardrailError::EphemeralNotAllowed {
                kind: task_kind.to_string(),
            });
        }

        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        *self.write() = State::Enabled { expires_at };
        tracing::info!("ephemeral mode enabled for task {task_id} until {expires_at}");
        Ok(())
    }

    /// Unconditional reset to disabled.
    pub fn disable(&self) {
        *self.write() = State::Disabled;
        tracing::info!("ephemeral mode disabled");
    }

    /// Lazy expiry transition.
    ///
    /// Fast path is a read lock; only an expired state upgrades to the write
    /// lock, where expiry is re-checked before transitioning so concurrent
    /// tickers race safely.
    pub fn tick(&self) {
        let now = Utc::now();
        let expired = matches!(*self.read(), State::Enabled { expires_at } if expires_at <= now);
        if !expired {
            return;
        }

        let mut state = self.write();
        if matches!(*state, State::Enabled { expires_at } if expires_at <= now) {
            *state = State::Disabled;
            tracing::info!("ephemeral mode expired and disabled");
        }
    }

    /// Whether the bypass is active right now.
    ///
    /// Purely observational — an expired-but-not-yet-ticked state reads as
    /// inactive.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(*self.read(), State::Enabled { expires_at } if expires_at > Utc::now())
    }

    /// Whether `path` is bypassed: the mode is active and the path critical.
    #[must_use]
    pub fn bypasses(&self, path: &str) -> bool {
        self.is_active() && is_critical_path(path)
    }

    /// Current state snapshot.
    #[must_use]
    pub fn status(&self) -> EphemeralStatus {
        match *self.read() {
            State::Disabled => EphemeralStatus {
                active: false,
                expires_at: None,
            },
            State::Enabled { expires_at } => EphemeralStatus {
                active: expires_at > Utc::now(),
                expires_at: Some(expires_at),
            },
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| {
            tracing::warn!("ephemeral state lock poisoned; recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| {
            tracing::warn!("ephemeral state lock poisoned; recovering");
            e.into_inner()
        })
    }
}

impl Default for EphemeralMode {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `path` names a critical manifest or lockfile.
#[must_use]
pub fn is_critical_path(path: &str) -> bool {
    CRITICAL_PATH_PATTERNS
        .iter()
        .any(|pattern| pattern_matches(pattern, path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_for_allowed_kinds() {
        let mode = EphemeralMode::new();
        assert!(mode.enable("t1", "scaffold", Duration::from_secs(60)).is_ok());
        assert!(mode.is_active());

        mode.disable();
        assert!(mode.enable("t2", "deps_fix", Duration::from_secs(60)).is_ok());
        assert!(mode.is_active());
    }

    #[test]
    fn test_rejects_other_kinds_without_state_change() {
        let mode = EphemeralMode::new();
        let err = mode
            .enable("t1", "refactor", Duration::from_secs(60))
            .unwrap_err();
        assert!(matches!(
            err,
            GuardrailError::EphemeralNotAllowed { kind } if kind == "refactor"
        ));
        assert!(!mode.is_active());

        // Rejection while enabled keeps the existing expiry.
        mode.enable("t2", "scaffold", Duration::from_secs(60)).unwrap();
        let before = mode.status();
        assert!(mode.enable("t3", "cleanup", Duration::from_secs(1)).is_err());
        assert_eq!(mode.status(), before);
    }

    #[test]
    fn test_tick_expires() {
        let mode = EphemeralMode::new();
        mode.enable("t1", "scaffold", Duration::from_millis(10)).unwrap();
        std::thread::sleep(Duration::from_millis(25));

        assert!(!mode.is_active());
        mode.tick();
        assert_eq!(mode.status().expires_at, None);
    }

    #[test]
    fn test_tick_leaves_live_state() {
        let mode = EphemeralMode::new();
        mode.enable("t1", "scaffold", Duration::from_secs(60)).unwrap();
        mode.tick();
        assert!(mode.is_active());
    }

    #[test]
    fn test_disable_resets() {
        let mode = EphemeralMode::new();
        mode.enable("t1", "scaffold", Duration::from_secs(60)).unwrap();
        mode.disable();
        assert!(!mode.is_active());
        assert_eq!(mode.status().expires_at, None);
    }

    #[test]
    fn test_bypasses_critical_paths_only() {
        let mode = EphemeralMode::new();
        mode.enable("t1", "scaffold", Duration::from_secs(60)).unwrap();

        assert!(mode.bypasses("go.mod"));
        assert!(mode.bypasses("package-lock.json"));
        assert!(mode.bypasses("yarn.lock"));
        assert!(!mode.bypasses("src/main.rs"));
    }

    #[test]
    fn test_no_bypass_while_disabled() {
        let mode = EphemeralMode::new();
        assert!(!mode.bypasses("go.mod"));
    }

    #[test]
    fn test_critical_path_patterns() {
        assert!(is_critical_path("go.mod"));
        assert!(is_critical_path("package.json"));
        assert!(is_critical_path("pnpm-lock.yaml"));
        assert!(!is_critical_path("Cargo.toml"));
    }
}
