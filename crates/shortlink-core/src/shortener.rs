use crate::record::{ClickEvent, LinkRecord, StatsView};
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;

type Result<T> = std::result::Result<T, crate::error::ShortlinkError>;

/// Parameters for creating a shortened URL.
#[derive(Debug, Clone, Default)]
pub struct ShortenParams {
    /// The original URL to be shortened.
    pub original_url: String,
    /// Validity window in minutes. Absent or non-positive values fall back
    /// to the store's default.
    pub validity_minutes: Option<i64>,
    /// Optional user-provided short code, validated by the store.
    pub custom_code: Option<String>,
}

impl ShortenParams {
    pub fn new(original_url: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            ..Self::default()
        }
    }

    pub fn with_validity(mut self, minutes: i64) -> Self {
        self.validity_minutes = Some(minutes);
        self
    }

    pub fn with_custom_code(mut self, code: impl Into<String>) -> Self {
        self.custom_code = Some(code.into());
        self
    }
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a new link and returns the stored record.
    async fn create(&self, params: ShortenParams) -> Result<LinkRecord>;

    /// Looks up a live link. Fails with `NotFound` or `Expired`.
    async fn resolve(&self, code: &ShortCode) -> Result<LinkRecord>;

    /// Records one redirect traversal. Fails with `NotFound` or `Expired`.
    async fn record_click(&self, code: &ShortCode, click: ClickEvent) -> Result<()>;

    /// Returns link statistics, including for expired but unswept links.
    async fn stats(&self, code: &ShortCode) -> Result<StatsView>;

    /// Removes every link that expired before `now`.
    async fn sweep_expired(&self, now: Timestamp) -> Result<u64>;

    /// Current time according to the store's clock.
    fn now(&self) -> Timestamp;
}
