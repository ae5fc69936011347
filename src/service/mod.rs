//! Key-Value Service Module
//!
//! The asynchronous façade callers use for create/read/delete. This layer
//! owns the duplicate-key and liveness checks; the table underneath only
//! provides atomic map operations.

pub mod handler;

pub use handler::{KvError, KvService};
