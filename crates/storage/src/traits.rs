//! Storage backend trait abstraction
//!
//! The durable call store is authoritative: gateways write through it and
//! client views fall back to its snapshots when the broadcast path drops events.

use async_trait::async_trait;
use tablecall_core::{Call, CallId, CallStatus, TableNumber};

use crate::change_feed::ChangeFeed;
use crate::error::StorageError;

/// Result of a forward-only status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// The record moved forward; carries the new state.
    Applied(Call),
    /// The record was already at or beyond the requested status.
    Unchanged(Call),
}

impl StatusUpdate {
    #[must_use]
    pub const fn applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    #[must_use]
    pub fn call(&self) -> &Call {
        match self {
            Self::Applied(call) | Self::Unchanged(call) => call,
        }
    }
}

/// Persistent call records with a live change feed.
#[async_trait]
pub trait CallStore: Send + Sync {
    /// Insert a new call. Returns `false` if a record with the same id exists;
    /// the existing record is left untouched.
    async fn insert_call(&self, call: &Call) -> Result<bool, StorageError>;

    /// Get call by ID.
    async fn get_call(&self, id: &CallId) -> Result<Option<Call>, StorageError>;

    /// All non-`done` calls, newest first.
    async fn active_calls(&self) -> Result<Vec<Call>, StorageError>;

    /// Non-`done` calls for one table, newest first.
    async fn active_calls_for_table(&self, table: &TableNumber)
    -> Result<Vec<Call>, StorageError>;

    /// Move a call forward to `status`. Earlier or equal targets are no-ops.
    /// Returns `NotFound` if the id is unknown.
    async fn advance_status(
        &self,
        id: &CallId,
        status: CallStatus,
    ) -> Result<StatusUpdate, StorageError>;

    /// Subscribe to appear/update/disappear transitions from now on.
    fn subscribe_changes(&self) -> ChangeFeed;
}
