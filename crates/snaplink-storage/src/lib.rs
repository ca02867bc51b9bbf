//! Storage backends implementing the snaplink [`Repository`] contract.
//!
//! - [`InMemoryRepository`]: process-local, for tests and development.
//! - [`MySqlRepository`]: durable, uniqueness enforced by table constraints.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use snaplink_core::repository::{ReadRepository, Repository, Result};
pub use snaplink_core::StorageError;
