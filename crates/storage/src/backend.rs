//! Unified storage backend with enum dispatch.

use async_trait::async_trait;
use tablecall_core::{Call, CallId, CallStatus, StoreConfig, TableNumber};

use crate::change_feed::ChangeFeed;
use crate::error::StorageError;
use crate::traits::{CallStore, StatusUpdate};

macro_rules! dispatch {
    ($self:expr, $method:ident ( $($arg:expr),* $(,)? )) => {
        match $self {
            StorageBackend::Memory(s) => <crate::MemoryStore as CallStore>::$method(s, $($arg),*).await,
            StorageBackend::Postgres(s) => <crate::pg_storage::PgStorage as CallStore>::$method(s, $($arg),*).await,
        }
    };
}

#[derive(Clone, Debug)]
pub enum StorageBackend {
    Memory(crate::MemoryStore),
    Postgres(crate::pg_storage::PgStorage),
}

impl StorageBackend {
    #[must_use]
    pub fn new_memory() -> Self {
        Self::Memory(crate::MemoryStore::new())
    }

    pub async fn new_postgres(database_url: &str) -> Result<Self, StorageError> {
        Ok(Self::Postgres(crate::pg_storage::PgStorage::new(database_url).await?))
    }

    pub async fn from_config(config: &StoreConfig) -> Result<Self, StorageError> {
        match config {
            StoreConfig::Memory => {
                tracing::warn!("using in-memory call store, records are lost on restart");
                Ok(Self::new_memory())
            },
            StoreConfig::Postgres { url } => Self::new_postgres(url).await,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

#[async_trait]
impl CallStore for StorageBackend {
    async fn insert_call(&self, call: &Call) -> Result<bool, StorageError> {
        dispatch!(self, insert_call(call))
    }

    async fn get_call(&self, id: &CallId) -> Result<Option<Call>, StorageError> {
        dispatch!(self, get_call(id))
    }

    async fn active_calls(&self) -> Result<Vec<Call>, StorageError> {
        dispatch!(self, active_calls())
    }

    async fn active_calls_for_table(
        &self,
        table: &TableNumber,
    ) -> Result<Vec<Call>, StorageError> {
        dispatch!(self, active_calls_for_table(table))
    }

    async fn advance_status(
        &self,
        id: &CallId,
        status: CallStatus,
    ) -> Result<StatusUpdate, StorageError> {
        dispatch!(self, advance_status(id, status))
    }

    fn subscribe_changes(&self) -> ChangeFeed {
        match self {
            Self::Memory(s) => s.subscribe_changes(),
            Self::Postgres(s) => s.subscribe_changes(),
        }
    }
}
