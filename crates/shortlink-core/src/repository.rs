use crate::error::StorageError;
use crate::record::{ClickEvent, LinkRecord};
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Why a click was or was not appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Recorded,
    NotFound,
    /// The record exists but `now` is past its expiry; nothing was written.
    Expired { expired_at: Timestamp },
}

/// Persistence contract for link records.
///
/// Every method is atomic with respect to concurrent calls on the same
/// short code. Backends never retry failed operations themselves.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Returns a consistent snapshot of the record, clicks included.
    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<LinkRecord>>;

    /// Stores `record` unless its short code is already present.
    /// Returns `false` (and changes nothing) on a collision.
    async fn insert_if_absent(&self, record: LinkRecord) -> Result<bool>;

    /// Appends a click if the record exists and is not expired at `now`.
    ///
    /// The existence check, the expiry check and the append happen in one
    /// critical section.
    async fn append_click(
        &self,
        code: &ShortCode,
        click: ClickEvent,
        now: Timestamp,
    ) -> Result<ClickOutcome>;

    /// Removes every record whose expiry is strictly before `before`.
    /// Returns the number of records removed.
    async fn delete_expired(&self, before: Timestamp) -> Result<u64>;
}

#[async_trait]
impl<T: Repository + ?Sized> Repository for Arc<T> {
    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        (**self).get_by_code(code).await
    }

    async fn insert_if_absent(&self, record: LinkRecord) -> Result<bool> {
        (**self).insert_if_absent(record).await
    }

    async fn append_click(
        &self,
        code: &ShortCode,
        click: ClickEvent,
        now: Timestamp,
    ) -> Result<ClickOutcome> {
        (**self).append_click(code, click, now).await
    }

    async fn delete_expired(&self, before: Timestamp) -> Result<u64> {
        (**self).delete_expired(before).await
    }
}
