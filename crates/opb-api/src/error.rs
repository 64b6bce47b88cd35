//! API error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to HTTP callers.
///
/// Every error renders as `{"error": "<msg>"}` with status 500; clients
/// key off the message, not the status.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request body or query was unusable.
    #[error("{0}")]
    BadRequest(String),

    /// Transaction or block validation failed.
    #[error(transparent)]
    State(#[from] opb_state::StateError),

    /// Keystore lookup or signing failed.
    #[error(transparent)]
    Wallet(#[from] opb_wallet::WalletError),

    /// Encoding failed.
    #[error(transparent)]
    Chain(#[from] opb_chain::ChainError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
