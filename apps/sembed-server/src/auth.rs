//! Static API-key check.

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::state::AppState;

pub const FORBIDDEN_DETAIL: &str = "Could not validate credentials";

/// Rejects with 403 unless the `Authorization` header equals the configured
/// key. Runs before the handler, so rejected requests never touch the gate.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_authorized(state.api_key.as_deref(), request.headers()) {
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), "Rejected request with invalid credentials");
        forbidden()
    }
}

pub fn is_authorized(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return false;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|provided| provided == expected)
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "detail": FORBIDDEN_DETAIL })),
    )
        .into_response()
}
