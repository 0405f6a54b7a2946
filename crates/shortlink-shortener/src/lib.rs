//! The shortlink store and its background expiry sweeper.
//!
//! Domain types and collaborator traits live in `shortlink_core`; this
//! crate wires them into a working [`Shortener`](shortlink_core::Shortener).

pub mod service;
pub mod sweeper;

pub use service::{ShortlinkStore, StoreSettings, DEFAULT_MAX_GENERATION_ATTEMPTS, DEFAULT_VALIDITY};
pub use sweeper::{Sweeper, DEFAULT_SWEEP_INTERVAL};
