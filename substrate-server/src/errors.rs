//! Maps `CoreError` onto HTTP status codes (spec §7: "The REST proxy maps
//! kinds to standard HTTP codes (404, 409, 400, 408, 503, 500)") and onto
//! the stdio JSON-RPC error envelope. Grounded on the teacher's
//! `errors.rs` `IntoResponse` impl for `MediaError`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use substrate_contracts::CoreError;

/// Wire-facing error envelope: `{ "error": { "kind": "...", "message": "..." } }`.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(value: CoreError) -> Self {
        ApiError(value)
    }
}

fn kind_and_status(err: &CoreError) -> (&'static str, StatusCode) {
    match err {
        CoreError::NotFound => ("not_found", StatusCode::NOT_FOUND),
        CoreError::Conflict(_) => ("conflict", StatusCode::CONFLICT),
        CoreError::InvalidTransition(_) => ("invalid_transition", StatusCode::BAD_REQUEST),
        CoreError::Validation(_) => ("validation", StatusCode::BAD_REQUEST),
        CoreError::Transient(_) => ("transient", StatusCode::SERVICE_UNAVAILABLE),
        CoreError::QueueFull => ("queue_full", StatusCode::SERVICE_UNAVAILABLE),
        CoreError::Unavailable(_) => ("unavailable", StatusCode::SERVICE_UNAVAILABLE),
        CoreError::Cancelled => ("cancelled", StatusCode::REQUEST_TIMEOUT),
        CoreError::Internal(_) => ("internal", StatusCode::INTERNAL_SERVER_ERROR),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (kind, status) = kind_and_status(&self.0);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "internal error");
        }
        let body = json!({ "error": { "kind": kind, "message": self.0.to_string() } });
        (status, Json(body)).into_response()
    }
}

/// Same taxonomy rendered as a JSON-RPC style error object for the stdio adapter.
#[derive(Serialize)]
pub struct RpcError {
    pub code: i32,
    pub kind: &'static str,
    pub message: String,
}

impl From<CoreError> for RpcError {
    fn from(value: CoreError) -> Self {
        let (kind, status) = kind_and_status(&value);
        RpcError {
            code: status.as_u16() as i32,
            kind,
            message: value.to_string(),
        }
    }
}
