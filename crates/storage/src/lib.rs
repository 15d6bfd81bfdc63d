//! Durable call store for tablecall
//!
//! PostgreSQL-backed storage with a LISTEN/NOTIFY change feed, plus an
//! in-memory store with the same semantics for development and tests.

mod backend;
mod change_feed;
pub mod error;
mod memory;
mod pg_migrations;
pub mod pg_storage;
#[cfg(test)]
mod tests;
pub mod traits;

pub use backend::StorageBackend;
pub use change_feed::ChangeFeed;
pub use error::StorageError;
pub use memory::MemoryStore;
pub use pg_storage::PgStorage;
pub use traits::{CallStore, StatusUpdate};
