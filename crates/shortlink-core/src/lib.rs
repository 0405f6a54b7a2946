//! Core types and traits for the Shortlink URL shortener.
//!
//! This crate provides the link model, the short code rules and the
//! collaborator traits (storage, clock, audit log) shared by the store,
//! the storage backends and the HTTP gateway.

pub mod audit;
pub mod clock;
pub mod error;
pub mod record;
pub mod repository;
pub mod shortcode;
pub mod shortener;

pub use audit::{AuditEvent, AuditLevel, AuditLogger, AuditPackage, AuditStack, NoopAuditLogger};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ShortlinkError, StorageError};
pub use record::{ClickEvent, LinkRecord, StatsView};
pub use repository::{ClickOutcome, Repository};
pub use shortcode::ShortCode;
pub use shortener::{ShortenParams, Shortener};
