use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use shortlink_core::{ClickEvent, StatsView};

/// Body of `POST /shorturls`.
///
/// `validity` is kept loose so that a non-integer value falls back to the
/// default instead of failing the request.
#[derive(Debug, Deserialize)]
pub struct CreateShortUrlRequest {
    pub url: Option<String>,
    pub validity: Option<serde_json::Value>,
    pub shortcode: Option<String>,
}

impl CreateShortUrlRequest {
    /// Minutes requested by the caller, if they sent a positive integer.
    pub fn validity_minutes(&self) -> Option<i64> {
        self.validity
            .as_ref()
            .and_then(serde_json::Value::as_i64)
            .filter(|minutes| *minutes > 0)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShortUrlResponse {
    pub short_link: String,
    pub expiry: Timestamp,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickResponse {
    pub timestamp: Timestamp,
    pub source: Option<String>,
    pub referrer: String,
    pub user_agent: Option<String>,
    pub location: &'static str,
}

impl From<ClickEvent> for ClickResponse {
    fn from(click: ClickEvent) -> Self {
        Self {
            timestamp: click.timestamp,
            source: click.source,
            referrer: click.referrer.unwrap_or_else(|| "Direct".to_string()),
            user_agent: click.user_agent,
            location: "Unknown",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub original_url: String,
    pub created_at: Timestamp,
    pub expiry: Timestamp,
    pub total_clicks: u64,
    pub clicks: Vec<ClickResponse>,
}

impl From<StatsView> for StatsResponse {
    fn from(stats: StatsView) -> Self {
        Self {
            original_url: stats.original_url,
            created_at: stats.created_at,
            expiry: stats.expiry_at,
            total_clicks: stats.click_count,
            clicks: stats.clicks.into_iter().map(ClickResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}
