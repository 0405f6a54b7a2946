use crate::error::TelemetryError;
use parking_lot::Mutex;
use shortlink_core::{AuditEvent, AuditLevel, AuditLogger};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use typed_builder::TypedBuilder;

pub const DEFAULT_AUDIT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_AUDIT_QUEUE_CAPACITY: usize = 1024;

/// Writes audit events to the local tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

impl AuditLogger for TracingAuditLogger {
    fn log(&self, event: AuditEvent) {
        let package = event.package.as_str();
        let message = event.message.trim();
        match event.level {
            AuditLevel::Debug => debug!(target: "audit", package, "{message}"),
            AuditLevel::Info => info!(target: "audit", package, "{message}"),
            AuditLevel::Warn => warn!(target: "audit", package, "{message}"),
            AuditLevel::Error | AuditLevel::Fatal => {
                error!(target: "audit", package, level = ?event.level, "{message}")
            }
        }
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct RemoteAuditConfig {
    /// Collector URL events are POSTed to.
    #[builder(setter(into))]
    pub endpoint: String,
    /// Sent as `Authorization: Bearer <token>` when present.
    #[builder(default, setter(into))]
    pub token: Option<String>,
    #[builder(default = DEFAULT_AUDIT_TIMEOUT)]
    pub timeout: Duration,
    /// Events beyond this many in flight are dropped.
    #[builder(default = DEFAULT_AUDIT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,
}

/// Ships audit events to an HTTP collector from a background task.
///
/// `log` only enqueues. A full queue or a failed delivery is reported with
/// `warn!` and the event is discarded.
#[derive(Debug, Clone)]
pub struct RemoteAuditLogger {
    tx: mpsc::Sender<AuditEvent>,
    worker: Arc<Mutex<Option<Worker>>>,
}

#[derive(Debug)]
struct Worker {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RemoteAuditLogger {
    /// Builds the HTTP client and spawns the delivery worker on the current
    /// tokio runtime. The worker exits on [`shutdown`](Self::shutdown) or
    /// once every logger clone is dropped.
    pub fn spawn(config: RemoteAuditConfig) -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (stop, stopped) = oneshot::channel();

        let task = tokio::spawn(deliver(client, config, rx, stopped));

        Ok(Self {
            tx,
            worker: Arc::new(Mutex::new(Some(Worker { stop, task }))),
        })
    }

    /// Stops accepting events and waits up to `grace` for the queued ones
    /// to be delivered. Later calls, from any clone, return immediately.
    pub async fn shutdown(&self, grace: Duration) {
        let worker = self.worker.lock().take();
        let Some(Worker { stop, mut task }) = worker else {
            return;
        };
        let _ = stop.send(());

        match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "audit delivery worker ended abnormally"),
            Err(_) => {
                warn!(?grace, "audit queue not drained in time, dropping the rest");
                task.abort();
            }
        }
    }
}

async fn deliver(
    client: reqwest::Client,
    config: RemoteAuditConfig,
    mut rx: mpsc::Receiver<AuditEvent>,
    mut stopped: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            event = rx.recv() => match event {
                Some(event) => send(&client, &config, event).await,
                None => break,
            },
            _ = &mut stopped => {
                rx.close();
                while let Some(event) = rx.recv().await {
                    send(&client, &config, event).await;
                }
                break;
            }
        }
    }
    debug!("audit delivery worker stopped");
}

async fn send(client: &reqwest::Client, config: &RemoteAuditConfig, event: AuditEvent) {
    let mut request = client.post(&config.endpoint).json(&event);
    if let Some(token) = &config.token {
        request = request.bearer_auth(token);
    }

    match request.send().await.and_then(|r| r.error_for_status()) {
        Ok(response) => trace!(status = %response.status(), "audit event delivered"),
        Err(err) => warn!(
            error = %err,
            package = %event.package,
            "failed to deliver audit event"
        ),
    }
}

impl AuditLogger for RemoteAuditLogger {
    fn log(&self, mut event: AuditEvent) {
        let trimmed = event.message.trim();
        if trimmed.len() != event.message.len() {
            event.message = trimmed.to_owned();
        }

        if let Err(err) = self.tx.try_send(event) {
            let reason = match err {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "worker stopped",
            };
            warn!(reason, "dropping audit event");
        }
    }
}
