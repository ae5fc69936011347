//! Thread-Safe Entry Table
//!
//! This module implements the in-memory working set for crdkv: a mapping
//! from string keys to entries, safe for concurrent access from every
//! request handler.
//!
//! ## Design Decisions
//!
//! 1. **Single `RwLock<HashMap>`**: multiple concurrent readers, exclusive
//!    writers. The table holds short string keys and small JSON values, so
//!    one lock is enough; there is no iteration on the hot path.
//! 2. **Atomic insert-if-absent**: `create` must never allow two callers to
//!    both pass an existence check and both write. The membership test and
//!    the insert happen under one write-lock acquisition.
//! 3. **Explicit handle, no globals**: the table is constructed once and
//!    passed around as `Arc<EntryTable>`, so tests can substitute an
//!    isolated table per test.
//!
//! The table knows nothing about liveness; expiry decisions live in
//! [`crate::storage::expiry`] and are applied by the service layer.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// A stored value with an optional absolute expiry deadline.
///
/// `expires_at` is a Unix-epoch timestamp in milliseconds. `None` means the
/// entry never expires. The deadline is computed exactly once, at write
/// time, and is persisted as-is so a restart does not reset expiry windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The stored payload. Opaque to the table; the boundary layer decides
    /// what goes in here (raw JSON text in practice).
    pub value: String,
    /// Absolute expiry deadline in epoch milliseconds, `None` = never.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl Entry {
    /// Creates an entry that never expires.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    /// Creates an entry with an absolute expiry deadline.
    pub fn with_deadline(value: impl Into<String>, expires_at: u64) -> Self {
        Self {
            value: value.into(),
            expires_at: Some(expires_at),
        }
    }
}

/// The in-memory key-value table shared by all operations.
///
/// This is the single source of truth during process lifetime. It is
/// hydrated from the snapshot file at startup and flushed back exactly once
/// at shutdown; no operation touches the disk.
///
/// # Thread Safety
///
/// Designed to be wrapped in an `Arc` and shared across handler tasks.
/// Each operation is atomic, but sequences of operations are not: a `get`
/// followed by a `remove` can interleave with another writer. The one
/// sequence that must not race, create's existence-check-then-insert, is
/// provided as the single atomic [`EntryTable::insert_if_absent`].
#[derive(Debug, Default)]
pub struct EntryTable {
    entries: RwLock<HashMap<String, Entry>>,
}

impl EntryTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a table from an already-deserialized map. Used by the
    /// snapshot loader.
    pub fn from_map(entries: HashMap<String, Entry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Returns a clone of the entry for `key`, expired or not.
    pub fn get(&self, key: &str) -> Option<Entry> {
        let entries = self.entries.read().unwrap();
        entries.get(key).cloned()
    }

    /// Inserts or overwrites unconditionally. Uniqueness is the caller's
    /// concern, not the table's.
    pub fn put(&self, key: impl Into<String>, entry: Entry) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(key.into(), entry);
    }

    /// Inserts `entry` only if `key` is not already present.
    ///
    /// The membership check and the insert happen under a single write
    /// lock, so two concurrent creates for the same key cannot both
    /// succeed.
    ///
    /// # Returns
    ///
    /// `true` if the insert occurred, `false` if the key was already
    /// present (the existing entry is left untouched).
    pub fn insert_if_absent(&self, key: impl Into<String>, entry: Entry) -> bool {
        let mut entries = self.entries.write().unwrap();
        match entries.entry(key.into()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    /// Removes and returns the entry for `key`, if present.
    pub fn remove(&self, key: &str) -> Option<Entry> {
        let mut entries = self.entries.write().unwrap();
        entries.remove(key)
    }

    /// Raw membership test. Note: present-but-expired keys count as
    /// present; liveness is not consulted here.
    pub fn contains_key(&self, key: &str) -> bool {
        let entries = self.entries.read().unwrap();
        entries.contains_key(key)
    }

    /// Removes every entry whose deadline has passed at `now`.
    ///
    /// This is the background sweep path; the invariant-bearing eviction
    /// still happens lazily on access in the service layer.
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    pub fn evict_expired(&self, now: u64) -> usize {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| crate::storage::expiry::is_live(entry, now));
        before - entries.len()
    }

    /// Number of entries currently stored (live or not).
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap();
        entries.len()
    }

    /// Returns true if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clones the whole table out for serialization. Only the snapshot
    /// writer calls this, single-threaded at shutdown.
    pub fn to_map(&self) -> HashMap<String, Entry> {
        let entries = self.entries.read().unwrap();
        entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let table = EntryTable::new();

        table.put("key", Entry::new("value"));
        assert_eq!(table.get("key"), Some(Entry::new("value")));
    }

    #[test]
    fn test_get_nonexistent() {
        let table = EntryTable::new();
        assert_eq!(table.get("nonexistent"), None);
    }

    #[test]
    fn test_put_overwrites() {
        let table = EntryTable::new();

        table.put("key", Entry::new("first"));
        table.put("key", Entry::new("second"));

        assert_eq!(table.get("key"), Some(Entry::new("second")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_insert_if_absent() {
        let table = EntryTable::new();

        assert!(table.insert_if_absent("key", Entry::new("first")));
        assert!(!table.insert_if_absent("key", Entry::new("second")));

        // The losing insert must not clobber the stored value.
        assert_eq!(table.get("key"), Some(Entry::new("first")));
    }

    #[test]
    fn test_insert_if_absent_sees_expired_entries() {
        let table = EntryTable::new();

        // Deadline long in the past; still physically present.
        table.put("key", Entry::with_deadline("stale", 1));
        assert!(!table.insert_if_absent("key", Entry::new("fresh")));
    }

    #[test]
    fn test_remove() {
        let table = EntryTable::new();

        table.put("key", Entry::new("value"));
        assert_eq!(table.remove("key"), Some(Entry::new("value")));
        assert_eq!(table.remove("key"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_contains_key_is_physical() {
        let table = EntryTable::new();

        assert!(!table.contains_key("key"));
        table.put("key", Entry::with_deadline("stale", 1));
        // Expired entries still count until something evicts them.
        assert!(table.contains_key("key"));
    }

    #[test]
    fn test_evict_expired() {
        let table = EntryTable::new();

        table.put("dead-1", Entry::with_deadline("v", 100));
        table.put("dead-2", Entry::with_deadline("v", 200));
        table.put("live", Entry::with_deadline("v", 10_000));
        table.put("forever", Entry::new("v"));

        let evicted = table.evict_expired(5_000);
        assert_eq!(evicted, 2);
        assert_eq!(table.len(), 2);
        assert!(table.contains_key("live"));
        assert!(table.contains_key("forever"));
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let table = Arc::new(EntryTable::new());
        let mut handles = vec![];

        for i in 0..10 {
            let table = Arc::clone(&table);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}-{}", i, j);
                    table.put(key.clone(), Entry::new("value"));
                    table.get(&key);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(table.len(), 1000);
    }

    #[test]
    fn test_concurrent_insert_if_absent_single_winner() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use std::thread;

        let table = Arc::new(EntryTable::new());
        let wins = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for i in 0..8 {
            let table = Arc::clone(&table);
            let wins = Arc::clone(&wins);
            handles.push(thread::spawn(move || {
                if table.insert_if_absent("contested", Entry::new(format!("writer-{}", i))) {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert_eq!(table.len(), 1);
    }
}
