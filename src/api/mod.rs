//! HTTP API Module
//!
//! The boundary layer: axum handlers for `GET`/`POST`/`DELETE` on
//! `/api/crd/data`, request validation (key length, payload size, TTL
//! field extraction) and the mapping from typed service failures to a
//! uniform `{"message": ...}` payload.

pub mod handler;

pub use handler::{router, AppState, SharedState};
