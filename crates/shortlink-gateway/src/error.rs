use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shortlink_core::ShortlinkError;
use tracing::error;

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    Shortlink(ShortlinkError),
    /// The request body was malformed or missing a required field.
    BadRequest(String),
    /// A stored target could not be placed in a `Location` header.
    InvalidRedirectTarget(String),
    RouteNotFound,
}

impl From<ShortlinkError> for AppError {
    fn from(err: ShortlinkError) -> Self {
        AppError::Shortlink(err)
    }
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Shortlink(err) => {
                let status = match err {
                    ShortlinkError::InvalidUrl { .. } | ShortlinkError::InvalidShortCode { .. } => {
                        StatusCode::BAD_REQUEST
                    }
                    ShortlinkError::ShortCodeTaken(_) => StatusCode::CONFLICT,
                    ShortlinkError::GenerationExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    ShortlinkError::NotFound(_) => StatusCode::NOT_FOUND,
                    ShortlinkError::Expired { .. } => StatusCode::GONE,
                    ShortlinkError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let message = match err {
                    ShortlinkError::NotFound(_) => "Shortcode not found".to_string(),
                    ShortlinkError::Expired { .. } => "Short link has expired".to_string(),
                    // Backend details stay in the server log.
                    ShortlinkError::Storage { .. } => "An unexpected error occurred".to_string(),
                    other => other.to_string(),
                };
                (status, message)
            }
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::InvalidRedirectTarget(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
            AppError::RouteNotFound => (StatusCode::NOT_FOUND, "Endpoint not found".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            error!(error = ?self, %status, "request failed");
        }

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error"),
            message,
        };
        (status, Json(body)).into_response()
    }
}
