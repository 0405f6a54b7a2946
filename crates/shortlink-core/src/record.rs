use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// One recorded traversal of a short code to its target URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// When the redirect happened.
    pub timestamp: Timestamp,
    /// The `Referer` header, if the client sent one.
    pub referrer: Option<String>,
    /// The caller's network address, used as a coarse location.
    pub source: Option<String>,
    /// The `User-Agent` header, if the client sent one.
    pub user_agent: Option<String>,
}

impl ClickEvent {
    /// A click without any request metadata.
    pub fn at(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            referrer: None,
            source: None,
            user_agent: None,
        }
    }
}

/// A stored link and its click history.
///
/// The click counter is derived from the click list, so the two can never
/// disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub short_code: ShortCode,
    pub original_url: String,
    pub created_at: Timestamp,
    pub expiry_at: Timestamp,
    clicks: Vec<ClickEvent>,
}

impl LinkRecord {
    /// Creates a record with an empty click history.
    pub fn new(
        short_code: ShortCode,
        original_url: impl Into<String>,
        created_at: Timestamp,
        expiry_at: Timestamp,
    ) -> Self {
        Self {
            short_code,
            original_url: original_url.into(),
            created_at,
            expiry_at,
            clicks: Vec::new(),
        }
    }

    /// Rebuilds a record from persisted parts.
    pub fn with_clicks(mut self, clicks: Vec<ClickEvent>) -> Self {
        self.clicks = clicks;
        self
    }

    /// A record is expired strictly after its expiry instant.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now > self.expiry_at
    }

    pub fn click_count(&self) -> u64 {
        self.clicks.len() as u64
    }

    pub fn clicks(&self) -> &[ClickEvent] {
        &self.clicks
    }

    /// Appends a click. Callers must hold whatever lock guards this record.
    pub fn push_click(&mut self, click: ClickEvent) {
        self.clicks.push(click);
    }
}

/// Statistics for a short code, as returned by `stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsView {
    pub original_url: String,
    pub created_at: Timestamp,
    pub expiry_at: Timestamp,
    pub click_count: u64,
    pub clicks: Vec<ClickEvent>,
}

impl From<LinkRecord> for StatsView {
    fn from(record: LinkRecord) -> Self {
        Self {
            click_count: record.click_count(),
            original_url: record.original_url,
            created_at: record.created_at,
            expiry_at: record.expiry_at,
            clicks: record.clicks,
        }
    }
}
