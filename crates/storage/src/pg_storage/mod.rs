//! PostgreSQL storage backend using sqlx.
//!
//! Split into modular files by concern: queries in `calls`, the
//! LISTEN/NOTIFY bridge in `listener`.

mod calls;
mod listener;

use crate::error::StorageError;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tablecall_core::{
    CHANGE_FEED_CAPACITY, Call, CallStatus, CallType, ChangeEvent, PG_POOL_ACQUIRE_TIMEOUT_SECS,
    PG_POOL_IDLE_TIMEOUT_SECS, PG_POOL_MAX_CONNECTIONS,
};
use tokio::sync::broadcast;

use super::pg_migrations::run_pg_migrations;

const CALL_COLUMNS: &str = "id, table_number, call_type, status, created_at";

#[derive(Clone, Debug)]
pub struct PgStorage {
    pool: PgPool,
    changes: broadcast::Sender<ChangeEvent>,
}

impl PgStorage {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(PG_POOL_MAX_CONNECTIONS)
            .acquire_timeout(std::time::Duration::from_secs(PG_POOL_ACQUIRE_TIMEOUT_SECS))
            .idle_timeout(std::time::Duration::from_secs(PG_POOL_IDLE_TIMEOUT_SECS))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        run_pg_migrations(&pool).await.map_err(|e| StorageError::Migration(e.to_string()))?;

        let (changes, _initial_rx) = broadcast::channel(CHANGE_FEED_CAPACITY);
        listener::spawn_change_listener(pool.clone(), changes.clone()).await?;
        tracing::info!("PgStorage initialized");
        Ok(Self { pool, changes })
    }
}

/// Parse `CallType` from a PostgreSQL text column.
pub(crate) fn parse_pg_call_type(s: &str) -> CallType {
    s.parse().unwrap_or_else(|_| {
        tracing::warn!(invalid_type = %s, "corrupt call_type in DB, defaulting to waiter");
        CallType::Waiter
    })
}

/// Status drives every merge decision, so a corrupt value is an error rather
/// than a silent default.
pub(crate) fn parse_pg_call_status(s: &str) -> Result<CallStatus, StorageError> {
    s.parse().map_err(|e| StorageError::DataCorruption {
        context: format!("call status '{s}'"),
        source: Box::new(e),
    })
}

pub(crate) fn row_to_call(row: &sqlx::postgres::PgRow) -> Result<Call, StorageError> {
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    Ok(Call {
        id: row.try_get::<String, _>("id")?.into(),
        table_number: row.try_get::<String, _>("table_number")?.as_str().into(),
        call_type: parse_pg_call_type(&row.try_get::<String, _>("call_type")?),
        status: parse_pg_call_status(&row.try_get::<String, _>("status")?)?,
        created_at,
    })
}
