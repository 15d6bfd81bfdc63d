//! In-memory call store for local development and tests.
//!
//! Mirrors the PostgreSQL backend's semantics: forward-only updates, no
//! deletions, and a change feed fed on every successful write.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tablecall_core::{
    CHANGE_FEED_CAPACITY, Call, CallId, CallStatus, ChangeEvent, TableNumber, Transition,
};
use tokio::sync::broadcast;

use crate::change_feed::ChangeFeed;
use crate::error::StorageError;
use crate::traits::{CallStore, StatusUpdate};

#[derive(Clone, Debug)]
pub struct MemoryStore {
    calls: Arc<RwLock<HashMap<CallId, Call>>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _initial_rx) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { calls: Arc::new(RwLock::new(HashMap::new())), changes }
    }

    fn emit(&self, transition: Transition, call: Call) {
        // No subscribers is fine: nobody is watching.
        drop(self.changes.send(ChangeEvent::new(transition, call)));
    }

    fn poisoned() -> StorageError {
        StorageError::Unavailable("memory store lock poisoned".to_owned())
    }

    /// Number of records, including `done` history.
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.calls.read().map_err(|_| Self::poisoned())?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

fn newest_first(mut calls: Vec<Call>) -> Vec<Call> {
    calls.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    calls
}

#[async_trait]
impl CallStore for MemoryStore {
    async fn insert_call(&self, call: &Call) -> Result<bool, StorageError> {
        {
            let mut calls = self.calls.write().map_err(|_| Self::poisoned())?;
            if calls.contains_key(&call.id) {
                return Ok(false);
            }
            calls.insert(call.id.clone(), call.clone());
        }
        self.emit(Transition::Appear, call.clone());
        Ok(true)
    }

    async fn get_call(&self, id: &CallId) -> Result<Option<Call>, StorageError> {
        Ok(self.calls.read().map_err(|_| Self::poisoned())?.get(id).cloned())
    }

    async fn active_calls(&self) -> Result<Vec<Call>, StorageError> {
        let calls = self.calls.read().map_err(|_| Self::poisoned())?;
        Ok(newest_first(calls.values().filter(|c| c.is_active()).cloned().collect()))
    }

    async fn active_calls_for_table(
        &self,
        table: &TableNumber,
    ) -> Result<Vec<Call>, StorageError> {
        let calls = self.calls.read().map_err(|_| Self::poisoned())?;
        Ok(newest_first(
            calls
                .values()
                .filter(|c| c.is_active() && &c.table_number == table)
                .cloned()
                .collect(),
        ))
    }

    async fn advance_status(
        &self,
        id: &CallId,
        status: CallStatus,
    ) -> Result<StatusUpdate, StorageError> {
        let updated = {
            let mut calls = self.calls.write().map_err(|_| Self::poisoned())?;
            let call = calls.get_mut(id).ok_or_else(|| StorageError::call_not_found(id))?;
            if status <= call.status {
                return Ok(StatusUpdate::Unchanged(call.clone()));
            }
            call.status = status;
            call.clone()
        };
        self.emit(Transition::Update, updated.clone());
        Ok(StatusUpdate::Applied(updated))
    }

    fn subscribe_changes(&self) -> ChangeFeed {
        ChangeFeed::new(self.changes.subscribe())
    }
}
