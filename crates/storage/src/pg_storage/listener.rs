//! Bridges PostgreSQL NOTIFY messages into the in-process change feed.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tablecall_core::{CHANGE_FEED_PG_CHANNEL, ChangeEvent};
use tokio::sync::broadcast;

use crate::error::StorageError;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Start listening before returning so no write after startup is missed.
pub(crate) async fn spawn_change_listener(
    pool: PgPool,
    changes: broadcast::Sender<ChangeEvent>,
) -> Result<(), StorageError> {
    let mut listener = PgListener::connect_with(&pool).await?;
    listener.listen(CHANGE_FEED_PG_CHANNEL).await?;

    tokio::spawn(async move {
        loop {
            match listener.recv().await {
                Ok(notification) => match serde_json::from_str::<ChangeEvent>(
                    notification.payload(),
                ) {
                    Ok(event) => {
                        tracing::debug!(
                            id = %event.call.id,
                            transition = ?event.transition,
                            "change feed event"
                        );
                        // Zero subscribers is normal between view mounts.
                        drop(changes.send(event));
                    },
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            payload = notification.payload(),
                            "malformed change notification"
                        );
                    },
                },
                Err(e) => {
                    // PgListener reconnects on the next recv; notifications sent
                    // while disconnected are lost and left to reconciliation.
                    tracing::warn!(error = %e, "change listener connection error, reconnecting");
                    tokio::time::sleep(RECONNECT_BACKOFF).await;
                },
            }
        }
    });
    Ok(())
}
