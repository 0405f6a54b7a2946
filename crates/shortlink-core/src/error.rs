use jiff::Timestamp;
use thiserror::Error;

/// Errors surfaced by storage backends.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

/// Errors returned by the shortlink store operations.
///
/// Every variant carries the short code or the operation it belongs to so
/// that callers can log it and translate it into a transport response.
#[derive(Debug, Clone, Error)]
pub enum ShortlinkError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid short code '{code}': {reason}")]
    InvalidShortCode { code: String, reason: String },
    #[error("short code already taken: {0}")]
    ShortCodeTaken(String),
    #[error("no free short code found after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("short code '{code}' expired at {expired_at}")]
    Expired { code: String, expired_at: Timestamp },
    #[error("{operation} failed: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: StorageError,
    },
}

impl ShortlinkError {
    pub fn storage(operation: &'static str) -> impl FnOnce(StorageError) -> Self {
        move |source| Self::Storage { operation, source }
    }
}
