//! Test doubles and module declarations for gateway tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tablecall_channel::{BroadcastChannel, ChannelError, LocalChannel, Subscription};
use tablecall_core::{BroadcastEvent, Call, CallId, CallStatus, TableNumber};
use tablecall_storage::{CallStore, ChangeFeed, MemoryStore, StatusUpdate, StorageError};

mod resolution_tests;

/// Local channel whose publishes can be made to fail.
pub struct FlakyChannel {
    inner: LocalChannel,
    failing: AtomicBool,
}

impl FlakyChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: LocalChannel::new("service-calls"),
            failing: AtomicBool::new(false),
        })
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl BroadcastChannel for FlakyChannel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn publish(&self, event: &BroadcastEvent) -> Result<(), ChannelError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChannelError::HttpStatus { code: 503, body: "relay down".to_owned() });
        }
        self.inner.publish(event).await
    }

    fn subscribe(&self) -> Subscription {
        self.inner.subscribe()
    }
}

/// Memory store whose writes and reads can be made to fail, and whose
/// inserts can be made slow.
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing: AtomicBool,
    insert_delay_ms: AtomicU64,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            failing: AtomicBool::new(false),
            insert_delay_ms: AtomicU64::new(0),
        })
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn delay_inserts(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.insert_delay_ms.store(millis, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("database down".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl CallStore for FlakyStore {
    async fn insert_call(&self, call: &Call) -> Result<bool, StorageError> {
        let delay = self.insert_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.check()?;
        self.inner.insert_call(call).await
    }

    async fn get_call(&self, id: &CallId) -> Result<Option<Call>, StorageError> {
        self.check()?;
        self.inner.get_call(id).await
    }

    async fn active_calls(&self) -> Result<Vec<Call>, StorageError> {
        self.check()?;
        self.inner.active_calls().await
    }

    async fn active_calls_for_table(
        &self,
        table: &TableNumber,
    ) -> Result<Vec<Call>, StorageError> {
        self.check()?;
        self.inner.active_calls_for_table(table).await
    }

    async fn advance_status(
        &self,
        id: &CallId,
        status: CallStatus,
    ) -> Result<StatusUpdate, StorageError> {
        self.check()?;
        self.inner.advance_status(id, status).await
    }

    fn subscribe_changes(&self) -> ChangeFeed {
        self.inner.subscribe_changes()
    }
}
