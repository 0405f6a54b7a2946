use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use shortlink_core::repository::{ClickOutcome, Repository, Result};
use shortlink_core::{ClickEvent, LinkRecord, ShortCode};
use tracing::trace;

/// In-memory implementation of the Repository trait using DashMap.
///
/// DashMap shards its keys over independent locks. Every operation on a
/// record runs under its shard's lock, which makes insert-if-absent and
/// the check-then-append of a click atomic per short code while codes in
/// other shards proceed in parallel.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    storage: DashMap<ShortCode, LinkRecord>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: DashMap::with_capacity(capacity),
        }
    }

    /// Number of stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        // Cloned while the shard read lock is held, so the counter and the
        // click list come from the same state.
        Ok(self.storage.get(code).map(|entry| entry.value().clone()))
    }

    async fn insert_if_absent(&self, record: LinkRecord) -> Result<bool> {
        match self.storage.entry(record.short_code.clone()) {
            Entry::Occupied(_) => {
                trace!(code = %record.short_code, "short code already present");
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }

    async fn append_click(
        &self,
        code: &ShortCode,
        click: ClickEvent,
        now: Timestamp,
    ) -> Result<ClickOutcome> {
        let Some(mut entry) = self.storage.get_mut(code) else {
            return Ok(ClickOutcome::NotFound);
        };

        if entry.is_expired_at(now) {
            return Ok(ClickOutcome::Expired {
                expired_at: entry.expiry_at,
            });
        }

        entry.push_click(click);
        Ok(ClickOutcome::Recorded)
    }

    async fn delete_expired(&self, before: Timestamp) -> Result<u64> {
        let mut removed = 0;
        self.storage.retain(|_, record| {
            let keep = record.expiry_at >= before;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use std::sync::Arc;

    fn base() -> Timestamp {
        Timestamp::from_second(1_700_000_000).unwrap()
    }

    fn record(code: &str, url: &str, validity: SignedDuration) -> LinkRecord {
        LinkRecord::new(ShortCode::new_unchecked(code), url, base(), base() + validity)
    }

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    #[tokio::test]
    async fn insert_and_get() {
        let repo = InMemoryRepository::new();

        let inserted = repo
            .insert_if_absent(record("abc123", "https://example.com", SignedDuration::from_mins(30)))
            .await
            .unwrap();
        assert!(inserted);

        let result = repo.get_by_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(result.original_url, "https://example.com");
        assert_eq!(result.click_count(), 0);
    }

    #[tokio::test]
    async fn get_nonexistent() {
        let repo = InMemoryRepository::new();
        assert!(repo.get_by_code(&code("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_collision_keeps_original() {
        let repo = InMemoryRepository::new();
        let validity = SignedDuration::from_mins(30);

        assert!(repo
            .insert_if_absent(record("abc123", "https://one.example", validity))
            .await
            .unwrap());
        assert!(!repo
            .insert_if_absent(record("abc123", "https://two.example", validity))
            .await
            .unwrap());

        let result = repo.get_by_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(result.original_url, "https://one.example");
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn codes_are_case_sensitive() {
        let repo = InMemoryRepository::new();
        let validity = SignedDuration::from_mins(30);

        assert!(repo
            .insert_if_absent(record("abcd", "https://lower.example", validity))
            .await
            .unwrap());
        assert!(repo
            .insert_if_absent(record("ABCD", "https://upper.example", validity))
            .await
            .unwrap());
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn append_click_to_live_record() {
        let repo = InMemoryRepository::new();
        repo.insert_if_absent(record("abc123", "https://example.com", SignedDuration::from_mins(1)))
            .await
            .unwrap();

        let outcome = repo
            .append_click(&code("abc123"), ClickEvent::at(base()), base())
            .await
            .unwrap();
        assert_eq!(outcome, ClickOutcome::Recorded);

        let result = repo.get_by_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(result.click_count(), 1);
        assert_eq!(result.clicks()[0].timestamp, base());
    }

    #[tokio::test]
    async fn append_click_to_expired_record_is_rejected() {
        let repo = InMemoryRepository::new();
        repo.insert_if_absent(record("abc123", "https://example.com", SignedDuration::from_mins(1)))
            .await
            .unwrap();

        let later = base() + SignedDuration::from_secs(61);
        let outcome = repo
            .append_click(&code("abc123"), ClickEvent::at(later), later)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ClickOutcome::Expired {
                expired_at: base() + SignedDuration::from_mins(1)
            }
        );

        let result = repo.get_by_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(result.click_count(), 0);
    }

    #[tokio::test]
    async fn append_click_to_missing_record() {
        let repo = InMemoryRepository::new();
        let outcome = repo
            .append_click(&code("nope"), ClickEvent::at(base()), base())
            .await
            .unwrap();
        assert_eq!(outcome, ClickOutcome::NotFound);
    }

    #[tokio::test]
    async fn delete_expired_removes_only_past_records() {
        let repo = InMemoryRepository::new();
        repo.insert_if_absent(record("short", "https://a.example", SignedDuration::from_mins(1)))
            .await
            .unwrap();
        repo.insert_if_absent(record("exact", "https://b.example", SignedDuration::from_mins(5)))
            .await
            .unwrap();
        repo.insert_if_absent(record("long", "https://c.example", SignedDuration::from_mins(60)))
            .await
            .unwrap();

        let removed = repo
            .delete_expired(base() + SignedDuration::from_mins(5))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(repo.get_by_code(&code("short")).await.unwrap().is_none());
        assert!(repo.get_by_code(&code("exact")).await.unwrap().is_some());
        assert!(repo.get_by_code(&code("long")).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_clicks_are_not_lost() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.insert_if_absent(record("hot", "https://example.com", SignedDuration::from_mins(30)))
            .await
            .unwrap();

        let handles: Vec<_> = (0..200)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    repo.append_click(&code("hot"), ClickEvent::at(base()), base())
                        .await
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), ClickOutcome::Recorded);
        }

        let result = repo.get_by_code(&code("hot")).await.unwrap().unwrap();
        assert_eq!(result.click_count(), 200);
        assert_eq!(result.clicks().len(), 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_of_same_code_have_one_winner() {
        let repo = Arc::new(InMemoryRepository::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    let url = format!("https://example{i}.com");
                    repo.insert_if_absent(record("race", &url, SignedDuration::from_mins(30)))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn clicks_racing_a_sweep_land_before_removal_or_miss() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.insert_if_absent(record("doomed", "https://example.com", SignedDuration::from_mins(1)))
            .await
            .unwrap();

        let start = Arc::new(tokio::sync::Barrier::new(5));

        let clickers: Vec<_> = (0..4)
            .map(|_| {
                let repo = Arc::clone(&repo);
                let start = Arc::clone(&start);
                tokio::spawn(async move {
                    start.wait().await;
                    let mut outcomes = Vec::with_capacity(500);
                    for _ in 0..500 {
                        let outcome = repo
                            .append_click(&code("doomed"), ClickEvent::at(base()), base())
                            .await
                            .unwrap();
                        outcomes.push(outcome);
                        tokio::task::yield_now().await;
                    }
                    outcomes
                })
            })
            .collect();

        let sweeper = {
            let repo = Arc::clone(&repo);
            let start = Arc::clone(&start);
            tokio::spawn(async move {
                start.wait().await;
                tokio::task::yield_now().await;
                repo.delete_expired(base() + SignedDuration::from_mins(2))
                    .await
                    .unwrap()
            })
        };

        assert_eq!(sweeper.await.unwrap(), 1);

        for clicker in clickers {
            let outcomes = clicker.await.unwrap();
            // Once a click has missed, the record is gone for good: no click
            // may be recorded after it.
            let first_miss = outcomes
                .iter()
                .position(|o| *o == ClickOutcome::NotFound)
                .unwrap_or(outcomes.len());
            assert!(outcomes[..first_miss]
                .iter()
                .all(|o| *o == ClickOutcome::Recorded));
            assert!(outcomes[first_miss..]
                .iter()
                .all(|o| *o == ClickOutcome::NotFound));
        }

        assert!(repo.get_by_code(&code("doomed")).await.unwrap().is_none());
        assert_eq!(
            repo.append_click(&code("doomed"), ClickEvent::at(base()), base())
                .await
                .unwrap(),
            ClickOutcome::NotFound
        );
    }
}
