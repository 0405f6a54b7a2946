use crate::error::AppError;
use crate::model::HealthResponse;
use axum::http::Uri;
use axum::Json;
use jiff::Timestamp;
use tracing::debug;

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Timestamp::now(),
        service: "URL Shortener Microservice",
    })
}

pub async fn not_found_handler(uri: Uri) -> AppError {
    debug!(%uri, "route not found");
    AppError::RouteNotFound
}
