//! Per-record mutual exclusion
//!
//! Each account and post has its own mutex, created on first use. An
//! operation locks every record it will read-check-write, always in sorted
//! key order, so two operations touching overlapping records serialize and
//! can never deadlock on each other.

use crate::types::{AccountId, PostId};
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Key of a lockable record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    /// Account balance and profile
    Account(AccountId),
    /// Post counters and totals
    Post(PostId),
}

impl From<&AccountId> for LockKey {
    fn from(id: &AccountId) -> Self {
        LockKey::Account(id.clone())
    }
}

impl From<&PostId> for LockKey {
    fn from(id: &PostId) -> Self {
        LockKey::Post(id.clone())
    }
}

/// Lazily populated table of record locks
#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<LockKey, Arc<Mutex<()>>>,
}

impl LockTable {
    /// Create empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the locks of every key in `keys`
    ///
    /// Duplicate keys are locked once.
    pub fn with_locks<R>(&self, keys: impl IntoIterator<Item = LockKey>, f: impl FnOnce() -> R) -> R {
        let mut keys: Vec<LockKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        // No shard ref may be held while blocking on a record mutex
        let mutexes: Vec<Arc<Mutex<()>>> = keys
            .into_iter()
            .map(|key| self.locks.entry(key).or_default().clone())
            .collect();

        let _guards: Vec<MutexGuard<'_, ()>> = mutexes.iter().map(|m| m.lock()).collect();
        f()
    }

    /// Number of records that have been locked at least once
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no record has been locked yet
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
