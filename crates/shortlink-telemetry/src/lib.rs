//! Process-wide observability: the tracing subscriber and the audit log
//! sinks used by the gateway binary.

pub mod audit;
pub mod error;
pub mod subscriber;

pub use audit::{RemoteAuditConfig, RemoteAuditLogger, TracingAuditLogger};
pub use error::TelemetryError;
pub use subscriber::{init_tracing, LogFormat, TelemetryGuard, TracingConfig};
