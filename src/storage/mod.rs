//! Storage Module
//!
//! The data layer of crdkv: the in-memory entry table, the expiry policy
//! that decides entry liveness, and the snapshot file that makes the table
//! survive restarts.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    EntryTable                        │
//! │        RwLock<HashMap<String, Entry>>                │
//! │   get / put / remove / insert_if_absent              │
//! └──────────┬─────────────────────────┬─────────────────┘
//!            │ startup load /          │ periodic
//!            │ shutdown save           │ evict_expired
//! ┌──────────┴──────────┐   ┌──────────┴──────────┐
//! │      Snapshot       │   │       Sweeper       │
//! │  (single JSON file) │   │ (background task)   │
//! └─────────────────────┘   └─────────────────────┘
//! ```
//!
//! The table is the single source of truth during process lifetime; the
//! snapshot is touched only at the process boundaries.

pub mod expiry;
pub mod snapshot;
pub mod table;

// Re-export commonly used types
pub use expiry::{start_sweeper, Sweeper, SweeperConfig};
pub use snapshot::{Snapshot, SnapshotError, MAX_SNAPSHOT_BYTES};
pub use table::{Entry, EntryTable};
