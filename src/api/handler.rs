//! HTTP Handlers for the CRD Surface
//!
//! Three operations, all on `/api/crd/data` with the key in the query
//! string:
//!
//! - `GET    ?key=k` — 200 with the stored `{value}`
//! - `POST   ?key=k` — 201 with the stored `{value}`; body is the raw JSON
//!   payload, with an optional `timeToLive` field (seconds, `0` or absent
//!   = never expires) that is stripped before storing
//! - `DELETE ?key=k` — 200 with the deleted `{value}`
//!
//! Validation lives here, not in the service: keys longer than 32
//! characters and bodies larger than 16 KiB are rejected with 400 before
//! the service is consulted. Domain failures (not found, expired,
//! duplicate key) are rendered as 200 with a `{"message"}` body — they are
//! benign outcomes, not server errors. The entry's expiry deadline is
//! never serialized into any response.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::service::{KvError, KvService};
use crate::storage::table::Entry;
use crate::{MAX_KEY_CHARS, MAX_VALUE_BYTES};

/// JSON field carrying the relative TTL in a create request body.
const TTL_FIELD: &str = "timeToLive";

/// Shared application state accessible by all handlers.
pub struct AppState {
    pub service: KvService,
}

/// Type alias for the Arc-wrapped state used with axum's State extractor.
pub type SharedState = Arc<AppState>;

/// Builds the router for the CRD API.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/api/crd/data",
            get(read_entry).post(create_entry).delete(delete_entry),
        )
        .with_state(state)
}

/// Query parameters common to all three operations.
#[derive(Debug, Deserialize)]
struct KeyParams {
    key: String,
}

/// Success payload. Only the stored value is surfaced; the absolute
/// expiry deadline stays internal.
#[derive(Debug, Serialize)]
struct ValueResponse {
    value: String,
}

impl From<Entry> for ValueResponse {
    fn from(entry: Entry) -> Self {
        Self { value: entry.value }
    }
}

/// Uniform error payload for every failure the caller can see.
#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

impl IntoResponse for KvError {
    fn into_response(self) -> Response {
        error!("{}", self);
        let status = match self {
            KvError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            // Benign domain outcomes keep the source convention of
            // 200-with-message.
            KvError::NotFound | KvError::Expired | KvError::DuplicateKey => StatusCode::OK,
        };
        (
            status,
            Json(MessageResponse {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

fn bad_request(message: &str) -> Response {
    error!("{}", message);
    (
        StatusCode::BAD_REQUEST,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// GET /api/crd/data?key=<key>
async fn read_entry(
    State(state): State<SharedState>,
    Query(params): Query<KeyParams>,
) -> Result<Json<ValueResponse>, KvError> {
    let entry = state.service.read(&params.key).await?;
    Ok(Json(entry.into()))
}

/// POST /api/crd/data?key=<key>
async fn create_entry(
    State(state): State<SharedState>,
    Query(params): Query<KeyParams>,
    body: String,
) -> Response {
    if params.key.chars().count() > MAX_KEY_CHARS {
        return bad_request("key size exceeds 32 chars");
    }
    if body.is_empty() {
        return bad_request("required data in body is missing");
    }
    if body.len() > MAX_VALUE_BYTES {
        return bad_request("data size exceeded 16KiB");
    }

    let (value, ttl_seconds) = match parse_body(&body) {
        Ok(parsed) => parsed,
        Err(message) => return bad_request(&message),
    };

    match state.service.create(&params.key, value, ttl_seconds).await {
        Ok(entry) => (StatusCode::CREATED, Json(ValueResponse::from(entry))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /api/crd/data?key=<key>
async fn delete_entry(
    State(state): State<SharedState>,
    Query(params): Query<KeyParams>,
) -> Result<Json<ValueResponse>, KvError> {
    let entry = state.service.delete(&params.key).await?;
    Ok(Json(entry.into()))
}

/// Splits a create body into the value to store and the relative TTL.
///
/// The body must be a JSON object. A `timeToLive` member (string or
/// number, whole seconds) is removed before the remainder is re-serialized
/// as the stored value; an absent member means TTL `0`, never expires.
fn parse_body(body: &str) -> Result<(String, u64), String> {
    let parsed: serde_json::Value =
        serde_json::from_str(body).map_err(|_| "request body is not valid JSON".to_string())?;
    let serde_json::Value::Object(mut object) = parsed else {
        return Err("request body must be a JSON object".to_string());
    };

    let ttl_seconds = match object.remove(TTL_FIELD) {
        None => 0,
        Some(raw) => parse_ttl(raw)?,
    };

    let value = serde_json::Value::Object(object).to_string();
    Ok((value, ttl_seconds))
}

fn parse_ttl(raw: serde_json::Value) -> Result<u64, String> {
    let invalid = || "the ttl is not a valid number".to_string();
    match raw {
        serde_json::Value::String(s) => s.parse::<u64>().map_err(|_| invalid()),
        serde_json::Value::Number(n) => n.as_u64().ok_or_else(invalid),
        _ => Err(invalid()),
    }
}
