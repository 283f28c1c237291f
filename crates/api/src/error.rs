//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crm::{CrmError, FetchError, NotifyError, TokenError};
use order_store::StoreError;
use saga::FailurePayload;
use thiserror::Error;

use crate::config::ConfigError;

/// API-level error type that maps to HTTP responses.
///
/// Operation outcomes are returned as payloads by the saga crate; this only
/// covers requests that never reach an operation.
#[derive(Debug)]
pub enum ApiError {
    /// The body is not valid JSON. Carries the operation's failure message.
    InvalidBody {
        rejection: JsonRejection,
        message: &'static str,
    },
}

impl ApiError {
    pub fn invalid_body(rejection: JsonRejection, message: &'static str) -> Self {
        ApiError::InvalidBody { rejection, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = match self {
            ApiError::InvalidBody { rejection, message } => {
                tracing::warn!(error = %rejection.body_text(), "rejected request body");
                FailurePayload::internal(rejection.body_text(), message)
            }
        };

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(payload),
        )
            .into_response()
    }
}

/// Maps a payload `code` to the HTTP status.
pub fn status_for(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] StoreError),

    #[error("token provider error: {0}")]
    Token(#[from] TokenError),

    #[error("CRM client error: {0}")]
    Crm(#[from] CrmError),

    #[error("file fetcher error: {0}")]
    Fetch(#[from] FetchError),

    #[error("notifier error: {0}")]
    Notify(#[from] NotifyError),

    #[error("metrics recorder error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
