//! # crdkv - A Single-Node Key-Value Store over HTTP
//!
//! crdkv exposes create, read and delete operations on string-valued
//! entries over a small HTTP API, with optional per-entry TTL expiry and
//! durable single-file persistence.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           crdkv                              │
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐  │
//! │  │ HTTP Server │───>│  Handlers   │───>│    KvService     │  │
//! │  │   (axum)    │    │ (validate)  │    │ create/read/del  │  │
//! │  └─────────────┘    └─────────────┘    └────────┬─────────┘  │
//! │                                                 │            │
//! │                                                 ▼            │
//! │  ┌─────────────┐  load/save   ┌──────────────────────────┐   │
//! │  │  Snapshot   │<────────────>│        EntryTable        │   │
//! │  │ (data.json) │  at process  │ RwLock<HashMap<K,Entry>> │   │
//! │  └─────────────┘  boundaries  └────────────▲─────────────┘   │
//! │                                            │                 │
//! │                               ┌────────────┴─────────────┐   │
//! │                               │         Sweeper          │   │
//! │                               │ (background tokio task)  │   │
//! │                               └──────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Semantics
//!
//! - **TTL**: a relative number of seconds supplied at write time,
//!   converted once to an absolute deadline; `0` means never expires.
//! - **Lazy expiry**: an expired entry is evicted as a side effect of the
//!   read/delete that discovers it; the background sweeper only bounds the
//!   memory footprint of entries nobody touches again.
//! - **Persistence**: the whole table is written to one JSON snapshot file
//!   at shutdown and read back at startup. Absolute deadlines are
//!   persisted, so restarting does not reset expiry windows.
//! - **Duplicates**: create is an atomic insert-if-absent; a key that is
//!   physically present always blocks creation, even when it is expired
//!   but not yet evicted.
//!
//! ## Module Overview
//!
//! - [`storage`]: entry table, expiry policy and snapshot persistence
//! - [`service`]: the create/read/delete service and its error taxonomy
//! - [`api`]: axum handlers, request validation and error rendering

pub mod api;
pub mod service;
pub mod storage;

// Re-export commonly used types for convenience
pub use api::{router, AppState, SharedState};
pub use service::{KvError, KvService};
pub use storage::{Entry, EntryTable, Snapshot, SnapshotError, Sweeper};

/// Maximum key length in characters.
pub const MAX_KEY_CHARS: usize = 32;

/// Maximum create-request payload size in bytes (16 KiB).
pub const MAX_VALUE_BYTES: usize = 16 * 1024;

/// The default port crdkv listens on
pub const DEFAULT_PORT: u16 = 8080;

/// The default host crdkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of crdkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
