use shortlink_core::Shortener;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Periodically removes expired links from a [`Shortener`].
///
/// The first sweep runs one full interval after spawning. Dropping the
/// handle stops the task as well as calling [`Sweeper::shutdown`].
pub struct Sweeper {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Sweeper {
    pub fn spawn(shortener: Arc<dyn Shortener>, interval: Duration) -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();
        let period = if interval.is_zero() {
            DEFAULT_SWEEP_INTERVAL
        } else {
            interval
        };

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        let now = shortener.now();
                        match shortener.sweep_expired(now).await {
                            Ok(0) => debug!("sweep found no expired links"),
                            Ok(removed) => info!(removed, "swept expired links"),
                            Err(err) => warn!(error = %err, "sweep failed, retrying next interval"),
                        }
                    }
                }
            }

            debug!("sweeper stopped");
        });

        Self {
            stop: Some(stop),
            task,
        }
    }

    /// Stops the sweeper and waits for an in-flight sweep to finish.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(err) = (&mut self.task).await {
            warn!(error = %err, "sweeper task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShortlinkStore;
    use jiff::{SignedDuration, Timestamp};
    use shortlink_core::{ManualClock, ShortenParams, ShortlinkError};
    use shortlink_generator::RandomGenerator;
    use shortlink_storage::InMemoryRepository;

    fn store(clock: &ManualClock) -> Arc<ShortlinkStore<Arc<InMemoryRepository>, RandomGenerator>> {
        Arc::new(
            ShortlinkStore::new(
                Arc::new(InMemoryRepository::new()),
                RandomGenerator::seeded(7, 11),
            )
            .with_clock(clock.clone()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn removes_expired_links_on_each_interval() {
        let clock = ManualClock::new(Timestamp::from_second(1_700_000_000).unwrap());
        let store = store(&clock);

        let doomed = store
            .create(ShortenParams::new("https://example.com").with_validity(1))
            .await
            .unwrap();
        let kept = store
            .create(ShortenParams::new("https://example.com").with_validity(60))
            .await
            .unwrap();
        clock.advance(SignedDuration::from_mins(2));

        let sweeper = Sweeper::spawn(store.clone(), Duration::from_secs(300));

        // Not yet: the first sweep waits a full interval.
        time::sleep(Duration::from_secs(299)).await;
        assert_eq!(store.repository().len(), 2);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.repository().len(), 1);

        let err = store.stats(&doomed.short_code).await.unwrap_err();
        assert!(matches!(err, ShortlinkError::NotFound(_)));
        assert!(store.resolve(&kept.short_code).await.is_ok());

        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_further_sweeps() {
        let clock = ManualClock::new(Timestamp::from_second(1_700_000_000).unwrap());
        let store = store(&clock);

        let sweeper = Sweeper::spawn(store.clone(), Duration::from_secs(60));
        sweeper.shutdown().await;

        store
            .create(ShortenParams::new("https://example.com").with_validity(1))
            .await
            .unwrap();
        clock.advance(SignedDuration::from_mins(5));

        time::sleep(Duration::from_secs(600)).await;
        assert_eq!(store.repository().len(), 1);
    }
}
