use crate::error::{AppError, Result};
use crate::model::{CreateShortUrlRequest, CreateShortUrlResponse, StatsResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use shortlink_core::{ClickEvent, ShortCode, ShortenParams};
use std::net::SocketAddr;
use tracing::{debug, info};
use url::Url;

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

pub async fn create_short_url_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<CreateShortUrlRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let validity_minutes = request.validity_minutes();

    let url = request
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AppError::BadRequest("URL field is required".to_string()))?;

    let params = ShortenParams {
        original_url: url,
        validity_minutes,
        // An empty code means "generate one".
        custom_code: request.shortcode.filter(|code| !code.is_empty()),
    };

    let record = state.shortener().create(params).await?;
    info!(code = %record.short_code, expiry_at = %record.expiry_at, "short link created");

    let response = CreateShortUrlResponse {
        short_link: record.short_code.to_url(state.base_url()),
        expiry: record.expiry_at,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(shortcode): Path<String>,
    request: Request,
) -> Result<Response> {
    let code = ShortCode::new_unchecked(shortcode);
    let record = state.shortener().resolve(&code).await?;

    // The stored URL is kept verbatim; the header carries its normalized,
    // percent-encoded form.
    let target = Url::parse(&record.original_url)
        .map_err(|_| AppError::InvalidRedirectTarget(record.original_url.clone()))?;
    let location = HeaderValue::from_str(target.as_str())
        .map_err(|_| AppError::InvalidRedirectTarget(record.original_url.clone()))?;

    let (parts, _body) = request.into_parts();
    let click = ClickEvent {
        timestamp: state.shortener().now(),
        referrer: header_string(&parts.headers, header::REFERER),
        source: parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string()),
        user_agent: header_string(&parts.headers, header::USER_AGENT),
    };
    state.shortener().record_click(&code, click).await?;

    debug!(code = %code, target = %target, "redirecting");

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

pub async fn stats_handler(
    State(state): State<AppState>,
    Path(shortcode): Path<String>,
) -> Result<Json<StatsResponse>> {
    let code = ShortCode::new_unchecked(shortcode);
    let stats = state.shortener().stats(&code).await?;
    Ok(Json(stats.into()))
}
