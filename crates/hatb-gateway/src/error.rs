//! Gateway error types and their HTTP mapping.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use hatb_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Webhook secret missing or wrong.
    #[error("Invalid secret token")]
    Unauthorized,

    /// Admin credentials missing or wrong.
    #[error("Unauthorized")]
    AdminUnauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] hatb_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::AdminUnauthorized => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            // Domain validation surfaced through the store (e.g. bad risk value).
            Self::Store(StoreError::Core(_)) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Telemetry(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = Json(json!({ "detail": self.to_string() }));
        match self {
            Self::AdminUnauthorized => (
                status,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"HATB Admin\"")],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}
