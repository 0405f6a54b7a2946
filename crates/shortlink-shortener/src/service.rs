use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use shortlink_core::{
    AuditEvent, AuditLevel, AuditLogger, AuditPackage, ClickEvent, ClickOutcome, Clock,
    LinkRecord, NoopAuditLogger, Repository, ShortCode, ShortenParams, Shortener, ShortlinkError,
    StatsView, SystemClock,
};
use shortlink_generator::Generator;
use std::sync::Arc;
use tracing::{debug, trace};
use typed_builder::TypedBuilder;
use url::Url;

type Result<T> = std::result::Result<T, ShortlinkError>;

pub const DEFAULT_VALIDITY: SignedDuration = SignedDuration::from_mins(30);
pub const DEFAULT_MAX_GENERATION_ATTEMPTS: u32 = 100;

/// Tunables for [`ShortlinkStore`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct StoreSettings {
    /// Validity applied when a request carries no usable validity.
    /// Non-positive values are replaced by [`DEFAULT_VALIDITY`].
    #[builder(default = DEFAULT_VALIDITY)]
    pub default_validity: SignedDuration,
    /// Upper bound on random draws per `create` before giving up.
    #[builder(default = DEFAULT_MAX_GENERATION_ATTEMPTS)]
    pub max_generation_attempts: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The link store: validation, code generation, expiry and click tracking
/// on top of a [`Repository`].
///
/// Atomicity comes from the repository; the store never holds a lock of
/// its own. Audit events are emitted after the repository call returns.
pub struct ShortlinkStore<R, G> {
    repository: Arc<R>,
    generator: Arc<G>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditLogger>,
    settings: StoreSettings,
}

impl<R: Repository, G: Generator> ShortlinkStore<R, G> {
    /// Creates a store on the system clock with auditing disabled.
    pub fn new(repository: R, generator: G) -> Self {
        Self {
            repository: Arc::new(repository),
            generator: Arc::new(generator),
            clock: Arc::new(SystemClock),
            audit: Arc::new(NoopAuditLogger),
            settings: StoreSettings::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_settings(mut self, mut settings: StoreSettings) -> Self {
        if !settings.default_validity.is_positive() {
            settings.default_validity = DEFAULT_VALIDITY;
        }
        settings.max_generation_attempts = settings.max_generation_attempts.max(1);
        self.settings = settings;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Clock reading truncated to whole milliseconds, the finest precision
    /// every backend persists.
    fn current_time(&self) -> Timestamp {
        let now = self.clock.now();
        Timestamp::from_millisecond(now.as_millisecond()).unwrap_or(now)
    }

    /// Checks that the URL is absolute, uses http or https and has a host.
    fn validate_url(raw: &str) -> Result<()> {
        let invalid = |reason: String| ShortlinkError::InvalidUrl {
            url: raw.to_owned(),
            reason,
        };

        if raw.trim().is_empty() {
            return Err(invalid("URL cannot be empty".to_string()));
        }

        let parsed = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(invalid(format!(
                    "URL scheme must be http or https, got '{other}'"
                )))
            }
        }

        match parsed.host_str() {
            Some(host) if !host.is_empty() => Ok(()),
            _ => Err(invalid("URL must have a host".to_string())),
        }
    }

    /// `now + validity`, falling back to the default window when the
    /// requested one is absent, non-positive or does not fit a timestamp.
    fn expiry_for(&self, now: Timestamp, validity_minutes: Option<i64>) -> Timestamp {
        validity_minutes
            .filter(|minutes| *minutes > 0)
            .and_then(|minutes| minutes.checked_mul(60))
            .and_then(|secs| now.checked_add(SignedDuration::from_secs(secs)).ok())
            .or_else(|| now.checked_add(self.settings.default_validity).ok())
            .unwrap_or(Timestamp::MAX)
    }

    /// Draws codes until one is inserted or the attempt budget runs out.
    async fn insert_generated(
        &self,
        original_url: String,
        created_at: Timestamp,
        expiry_at: Timestamp,
    ) -> Result<LinkRecord> {
        let attempts = self.settings.max_generation_attempts;

        for attempt in 1..=attempts {
            let code: ShortCode = self.generator.generate().into();
            let record = LinkRecord::new(code, original_url.clone(), created_at, expiry_at);

            if self
                .repository
                .insert_if_absent(record.clone())
                .await
                .map_err(ShortlinkError::storage("create"))?
            {
                return Ok(record);
            }

            debug!(attempt, code = %record.short_code, "generated short code collided, drawing again");
        }

        Err(ShortlinkError::GenerationExhausted { attempts })
    }

    async fn try_create(&self, params: ShortenParams) -> Result<LinkRecord> {
        Self::validate_url(&params.original_url)?;

        // Validate before touching the repository so a bad request never
        // writes anything.
        let custom_code = params.custom_code.map(ShortCode::new).transpose()?;

        let now = self.current_time();
        let expiry_at = self.expiry_for(now, params.validity_minutes);

        match custom_code {
            Some(code) => {
                let record = LinkRecord::new(code, params.original_url, now, expiry_at);
                let inserted = self
                    .repository
                    .insert_if_absent(record.clone())
                    .await
                    .map_err(ShortlinkError::storage("create"))?;

                if !inserted {
                    return Err(ShortlinkError::ShortCodeTaken(record.short_code.to_string()));
                }
                Ok(record)
            }
            None => self.insert_generated(params.original_url, now, expiry_at).await,
        }
    }

    async fn try_resolve(&self, code: &ShortCode) -> Result<LinkRecord> {
        trace!(code = %code, "resolving short code");

        let record = self
            .repository
            .get_by_code(code)
            .await
            .map_err(ShortlinkError::storage("resolve"))?
            .ok_or_else(|| ShortlinkError::NotFound(code.to_string()))?;

        if record.is_expired_at(self.current_time()) {
            debug!(code = %code, expiry_at = %record.expiry_at, "record has expired");
            return Err(ShortlinkError::Expired {
                code: code.to_string(),
                expired_at: record.expiry_at,
            });
        }

        Ok(record)
    }

    async fn try_record_click(&self, code: &ShortCode, click: ClickEvent) -> Result<()> {
        let outcome = self
            .repository
            .append_click(code, click, self.current_time())
            .await
            .map_err(ShortlinkError::storage("record_click"))?;

        match outcome {
            ClickOutcome::Recorded => Ok(()),
            ClickOutcome::NotFound => Err(ShortlinkError::NotFound(code.to_string())),
            ClickOutcome::Expired { expired_at } => Err(ShortlinkError::Expired {
                code: code.to_string(),
                expired_at,
            }),
        }
    }

    async fn try_stats(&self, code: &ShortCode) -> Result<StatsView> {
        self.repository
            .get_by_code(code)
            .await
            .map_err(ShortlinkError::storage("stats"))?
            .map(StatsView::from)
            .ok_or_else(|| ShortlinkError::NotFound(code.to_string()))
    }

    fn audit(&self, level: AuditLevel, package: AuditPackage, message: String) {
        self.audit.log(AuditEvent::new(level, package, message));
    }

    fn audit_failure(&self, operation: &str, err: &ShortlinkError) {
        let level = match err {
            ShortlinkError::Storage { .. } | ShortlinkError::GenerationExhausted { .. } => {
                AuditLevel::Error
            }
            _ => AuditLevel::Warn,
        };
        self.audit(level, AuditPackage::Service, format!("{operation} failed: {err}"));
    }
}

#[async_trait]
impl<R: Repository, G: Generator> Shortener for ShortlinkStore<R, G> {
    async fn create(&self, params: ShortenParams) -> Result<LinkRecord> {
        let result = self.try_create(params).await;
        match &result {
            Ok(record) => self.audit(
                AuditLevel::Info,
                AuditPackage::Service,
                format!(
                    "Created short URL: {} -> {}",
                    record.short_code, record.original_url
                ),
            ),
            Err(err) => self.audit_failure("create", err),
        }
        result
    }

    async fn resolve(&self, code: &ShortCode) -> Result<LinkRecord> {
        let result = self.try_resolve(code).await;
        match &result {
            Ok(record) => self.audit(
                AuditLevel::Debug,
                AuditPackage::Service,
                format!("Resolved short code: {code} -> {}", record.original_url),
            ),
            Err(err) => self.audit_failure("resolve", err),
        }
        result
    }

    async fn record_click(&self, code: &ShortCode, click: ClickEvent) -> Result<()> {
        let result = self.try_record_click(code, click).await;
        match &result {
            Ok(()) => self.audit(
                AuditLevel::Info,
                AuditPackage::Service,
                format!("Recorded click for short code: {code}"),
            ),
            Err(err) => self.audit_failure("record_click", err),
        }
        result
    }

    async fn stats(&self, code: &ShortCode) -> Result<StatsView> {
        let result = self.try_stats(code).await;
        match &result {
            Ok(_) => self.audit(
                AuditLevel::Info,
                AuditPackage::Service,
                format!("Statistics retrieved for short code: {code}"),
            ),
            Err(err) => self.audit_failure("stats", err),
        }
        result
    }

    async fn sweep_expired(&self, now: Timestamp) -> Result<u64> {
        let result = self
            .repository
            .delete_expired(now)
            .await
            .map_err(ShortlinkError::storage("sweep_expired"));

        match &result {
            Ok(0) => trace!("no expired links to sweep"),
            Ok(removed) => self.audit(
                AuditLevel::Info,
                AuditPackage::CronJob,
                format!("Cleaned up {removed} expired URLs"),
            ),
            Err(err) => self.audit(
                AuditLevel::Error,
                AuditPackage::CronJob,
                format!("sweep_expired failed: {err}"),
            ),
        }
        result
    }

    fn now(&self) -> Timestamp {
        self.current_time()
    }
}
