//! Create/Read/Delete Operations
//!
//! `KvService` orchestrates every operation against the shared entry
//! table, applying the expiry policy and the duplicate/not-found checks.
//! Conceptually each key moves through `absent → live → (expired |
//! deleted)`; `expired` is never a stored state — it is inferred at access
//! time and collapses straight back to `absent` by evicting the entry.
//!
//! The service takes the table as an explicit `Arc` handle so tests can
//! substitute an isolated table per test.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::storage::expiry;
use crate::storage::table::{Entry, EntryTable};

/// Typed failures returned to the boundary layer.
///
/// These are domain outcomes, not server faults: the boundary layer maps
/// each variant to a caller-visible `{message}` payload without leaking
/// any internal detail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KvError {
    /// Bad key or payload shape; always the caller's mistake.
    #[error("{0}")]
    InvalidArgument(String),

    /// No entry is paired with the given key.
    #[error("data not found")]
    NotFound,

    /// The entry existed but its deadline has passed. The stale entry is
    /// evicted as part of the failing access, so a retry reports
    /// [`KvError::NotFound`].
    #[error("the value has expired")]
    Expired,

    /// Create collision: the key is already taken.
    #[error("key already exists")]
    DuplicateKey,
}

/// The key-value service: create, read and delete against one shared
/// [`EntryTable`].
#[derive(Debug, Clone)]
pub struct KvService {
    table: Arc<EntryTable>,
}

impl KvService {
    /// Creates a service over the given table handle.
    pub fn new(table: Arc<EntryTable>) -> Self {
        Self { table }
    }

    /// The table this service operates on.
    pub fn table(&self) -> &Arc<EntryTable> {
        &self.table
    }

    /// Reads the entry for `key`.
    ///
    /// Fails with [`KvError::NotFound`] if the key is absent. A
    /// present-but-expired entry is evicted before [`KvError::Expired`] is
    /// returned (lazy expiry).
    pub async fn read(&self, key: &str) -> Result<Entry, KvError> {
        if key.is_empty() {
            return Err(KvError::InvalidArgument("key must not be empty".into()));
        }

        let entry = self.table.get(key).ok_or(KvError::NotFound)?;
        if !expiry::is_live(&entry, expiry::now_millis()) {
            self.table.remove(key);
            debug!(key = %key, "expired entry evicted on read");
            return Err(KvError::Expired);
        }
        Ok(entry)
    }

    /// Stores `value` under `key` with a relative TTL in seconds
    /// (`0` = never expires) and returns the stored entry.
    ///
    /// Fails with [`KvError::DuplicateKey`] if the key is already present.
    /// The existence check is a raw membership test folded into a single
    /// atomic insert: an expired-but-not-yet-evicted key still blocks
    /// creation until a read/delete path evicts it.
    pub async fn create(
        &self,
        key: &str,
        value: String,
        ttl_seconds: u64,
    ) -> Result<Entry, KvError> {
        if key.is_empty() || value.is_empty() {
            return Err(KvError::InvalidArgument(
                "key or data can't be empty".into(),
            ));
        }

        let entry = Entry {
            value,
            expires_at: expiry::expires_at(ttl_seconds, expiry::now_millis()),
        };
        if !self.table.insert_if_absent(key, entry.clone()) {
            return Err(KvError::DuplicateKey);
        }
        debug!(key = %key, ttl_seconds = ttl_seconds, "entry created");
        Ok(entry)
    }

    /// Deletes the entry for `key` and returns the removed value.
    ///
    /// Same liveness semantics as [`KvService::read`]: an expired entry is
    /// evicted and reported as [`KvError::Expired`]; an absent key as
    /// [`KvError::NotFound`].
    pub async fn delete(&self, key: &str) -> Result<Entry, KvError> {
        if key.is_empty() {
            return Err(KvError::InvalidArgument("key must not be empty".into()));
        }

        let entry = self.table.get(key).ok_or(KvError::NotFound)?;
        if !expiry::is_live(&entry, expiry::now_millis()) {
            self.table.remove(key);
            debug!(key = %key, "expired entry evicted on delete");
            return Err(KvError::Expired);
        }
        // The entry may have been swapped by a concurrent writer between
        // the liveness check and here; last writer wins.
        self.table.remove(key).ok_or(KvError::NotFound)
    }
}
