use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStack {
    Backend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// The part of the service an audit event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditPackage {
    Cache,
    Controller,
    CronJob,
    Db,
    Domain,
    Handler,
    Repository,
    Route,
    Service,
    Auth,
    Config,
    Middleware,
    Utils,
    System,
}

impl AuditPackage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditPackage::Cache => "cache",
            AuditPackage::Controller => "controller",
            AuditPackage::CronJob => "cron_job",
            AuditPackage::Db => "db",
            AuditPackage::Domain => "domain",
            AuditPackage::Handler => "handler",
            AuditPackage::Repository => "repository",
            AuditPackage::Route => "route",
            AuditPackage::Service => "service",
            AuditPackage::Auth => "auth",
            AuditPackage::Config => "config",
            AuditPackage::Middleware => "middleware",
            AuditPackage::Utils => "utils",
            AuditPackage::System => "system",
        }
    }
}

impl Display for AuditPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured audit log line, in the shape the log collector accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub stack: AuditStack,
    pub level: AuditLevel,
    pub package: AuditPackage,
    pub message: String,
}

impl AuditEvent {
    pub fn new(level: AuditLevel, package: AuditPackage, message: impl Into<String>) -> Self {
        Self {
            stack: AuditStack::Backend,
            level,
            package,
            message: message.into(),
        }
    }

    pub fn info(package: AuditPackage, message: impl Into<String>) -> Self {
        Self::new(AuditLevel::Info, package, message)
    }

    pub fn warn(package: AuditPackage, message: impl Into<String>) -> Self {
        Self::new(AuditLevel::Warn, package, message)
    }

    pub fn error(package: AuditPackage, message: impl Into<String>) -> Self {
        Self::new(AuditLevel::Error, package, message)
    }
}

/// Fire-and-forget sink for audit events.
///
/// `log` must return promptly and must never fail the caller: transport
/// problems are reported locally by the implementation and swallowed.
pub trait AuditLogger: Send + Sync + 'static {
    fn log(&self, event: AuditEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditLogger;

impl AuditLogger for NoopAuditLogger {
    fn log(&self, _event: AuditEvent) {}
}

impl<T: AuditLogger + ?Sized> AuditLogger for Arc<T> {
    fn log(&self, event: AuditEvent) {
        (**self).log(event)
    }
}
