//! Pre-mutation backup storage for rollback.
//!
//! One entry per path, holding the file content captured immediately before a
//! mutation. Entries leave the store three ways: rollback consumes them, the
//! owner discards them after committing to the applied change, or the oldest
//! entry is evicted when the store is at capacity. The cap keeps a process
//! that never rolls back from accumulating backups without bound.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

/// Default maximum number of retained backups.
pub const DEFAULT_BACKUP_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
struct BackupEntry {
    content: String,
    created_at: DateTime<Utc>,
}

/// Bounded, path-keyed store of pre-mutation file contents.
#[derive(Debug)]
pub struct BackupStore {
    entries: RwLock<HashMap<String, BackupEntry>>,
    capacity: usize,
}

impl BackupStore {
    /// Creates a store retaining at most `capacity` backups.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Records `content` as the backup for `path`, replacing any previous
    /// entry. At capacity, the oldest entry for another path is evicted.
    pub fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        let path = path.into();
        let mut entries = self.write();

        if !entries.contains_key(&path) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(p, _)| p.clone());
            if let Some(evicted) = oldest {
                entries.remove(&evicted);
                tracing::warn!("backup store at capacity; evicted oldest entry for {evicted}");
            }
        }

        entries.insert(
            path,
            BackupEntry {
                content: content.into(),
                created_at: Utc::now(),
            },
        );
    }

    /// The backed-up content for `path`, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<String> {
        self.read().get(path).map(|entry| entry.content.clone())
    }

    /// Removes the entry for `path`, returning whether one existed.
    ///
    /// This is the commit half of the release contract: a caller that accepts
    /// an applied change should discard its backup.
    pub fn discard(&self, path: &str) -> bool {
        self.write().remove(path).is_some()
    }

    /// Whether a backup exists for `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.read().contains_key(path)
    }

    /// Number of retained backups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, BackupEntry>> {
        self.entries.read().unwrap_or_else(|e| {
            tracing::warn!("backup store lock poisoned; recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, BackupEntry>> {
        self.entries.write().unwrap_or_else(|e| {
            tracing::warn!("backup store lock poisoned; recovering");
            e.into_inner()
        })
    }
}

impl Default for BackupStore {
    fn default() -> Self {
        Self::new(DEFAULT_BACKUP_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
