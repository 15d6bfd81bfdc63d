//! CallStore implementation for PgStorage.

use super::*;

use crate::change_feed::ChangeFeed;
use crate::traits::{CallStore, StatusUpdate};
use async_trait::async_trait;
use tablecall_core::{CallId, TableNumber};

#[async_trait]
impl CallStore for PgStorage {
    async fn insert_call(&self, call: &Call) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT INTO calls (id, table_number, call_type, status, created_at)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (id) DO NOTHING",
        )
        .bind(call.id.as_str())
        .bind(call.table_number.as_str())
        .bind(call.call_type.as_str())
        .bind(call.status.as_str())
        .bind(call.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_call(&self, id: &CallId) -> Result<Option<Call>, StorageError> {
        let row = sqlx::query(&format!("SELECT {CALL_COLUMNS} FROM calls WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_call).transpose()
    }

    async fn active_calls(&self) -> Result<Vec<Call>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {CALL_COLUMNS} FROM calls
               WHERE status <> 'done'
               ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_call).collect()
    }

    async fn active_calls_for_table(
        &self,
        table: &TableNumber,
    ) -> Result<Vec<Call>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {CALL_COLUMNS} FROM calls
               WHERE table_number = $1 AND status <> 'done'
               ORDER BY created_at DESC, id DESC"
        ))
        .bind(table.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_call).collect()
    }

    async fn advance_status(
        &self,
        id: &CallId,
        status: CallStatus,
    ) -> Result<StatusUpdate, StorageError> {
        // Forward-only: the rank guard makes concurrent resolutions idempotent.
        let row = sqlx::query(&format!(
            "UPDATE calls
               SET status = $2, updated_at = NOW()
               WHERE id = $1
                 AND (CASE status WHEN 'pending' THEN 0 WHEN 'processing' THEN 1 ELSE 2 END) < $3
               RETURNING {CALL_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(status.as_str())
        .bind(status.rank())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(StatusUpdate::Applied(row_to_call(&row)?)),
            None => match self.get_call(id).await? {
                Some(current) => Ok(StatusUpdate::Unchanged(current)),
                None => Err(StorageError::call_not_found(id)),
            },
        }
    }

    fn subscribe_changes(&self) -> ChangeFeed {
        ChangeFeed::new(self.changes.subscribe())
    }
}
