//! Storage backends for link records.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use shortlink_core::repository::{ClickOutcome, Repository};
pub use shortlink_core::StorageError;
