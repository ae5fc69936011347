//! Snapshot Persistence
//!
//! Durable storage for the entry table: one JSON file holding the whole
//! table, written at shutdown and read back at startup. There is no
//! per-operation I/O, no write-ahead log and no incremental diffing; data
//! loss between snapshots is an accepted limitation of this design.
//!
//! The snapshot persists absolute expiry deadlines, so a restart does not
//! reset TTL windows. Saves go to a temporary path first and are moved into
//! place with an atomic rename, so a crash mid-write never leaves a
//! half-written snapshot behind.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::storage::table::{Entry, EntryTable};

/// Hard cap on the snapshot size, on disk and in serialized form: 1 GiB.
pub const MAX_SNAPSHOT_BYTES: u64 = 1024 * 1024 * 1024;

/// File name of the snapshot inside the data directory.
const SNAPSHOT_FILE: &str = "data.json";

/// Errors that can occur while loading or saving the snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file exists but does not parse as a table encoding.
    #[error("snapshot file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The snapshot exceeds [`MAX_SNAPSHOT_BYTES`], refusing to load it
    /// into memory or to truncate it on save.
    #[error("snapshot size {0} bytes exceeds the 1 GiB limit")]
    SizeExceeded(u64),
}

/// Handle to the on-disk snapshot of the entry table.
///
/// Only touched single-threaded at process boundaries (startup load,
/// shutdown save), so no locking is needed here.
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    /// Creates a snapshot handle rooted at `data_dir`. The file itself is
    /// `<data_dir>/data.json`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(SNAPSHOT_FILE),
        }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot into a fresh [`EntryTable`].
    ///
    /// If the file does not exist yet it is created empty and an empty
    /// table is returned. An existing but empty file also yields an empty
    /// table. Fails with [`SnapshotError::SizeExceeded`] before parsing if
    /// the file is over 1 GiB, and with [`SnapshotError::Corrupt`] if the
    /// contents are not a valid table encoding.
    pub fn load(&self) -> Result<EntryTable, SnapshotError> {
        if !self.path.exists() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.path, b"")?;
            info!(path = %self.path.display(), "snapshot file created");
            return Ok(EntryTable::new());
        }

        check_size(fs::metadata(&self.path)?.len())?;

        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(EntryTable::new());
        }

        let entries: HashMap<String, Entry> = serde_json::from_str(&contents)?;
        info!(
            path = %self.path.display(),
            keys = entries.len(),
            "snapshot loaded"
        );
        Ok(EntryTable::from_map(entries))
    }

    /// Serializes the whole table and writes it to the snapshot file.
    ///
    /// The write is all-or-nothing: the payload goes to `data.json.tmp`
    /// first and is renamed over the snapshot. Fails with
    /// [`SnapshotError::SizeExceeded`] instead of truncating if the
    /// serialized table is over 1 GiB.
    pub fn save(&self, table: &EntryTable) -> Result<(), SnapshotError> {
        let entries = table.to_map();
        let payload = serde_json::to_vec(&entries)?;
        check_size(payload.len() as u64)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &payload)?;
        fs::rename(&tmp_path, &self.path)?;

        info!(
            path = %self.path.display(),
            keys = entries.len(),
            bytes = payload.len(),
            "snapshot saved"
        );
        Ok(())
    }
}

/// Enforces the 1 GiB cap shared by the load (on-disk size) and save
/// (serialized payload) paths.
fn check_size(bytes: u64) -> Result<(), SnapshotError> {
    if bytes > MAX_SNAPSHOT_BYTES {
        Err(SnapshotError::SizeExceeded(bytes))
    } else {
        Ok(())
    }
}
