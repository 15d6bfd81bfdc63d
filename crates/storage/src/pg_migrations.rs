//! PostgreSQL schema migrations for tablecall storage.

use sqlx::PgPool;
use tablecall_core::CHANGE_FEED_PG_CHANNEL;

use crate::error::StorageError;

/// Run all PostgreSQL migrations. Every statement is idempotent.
pub async fn run_pg_migrations(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS calls (
            id TEXT PRIMARY KEY,
            table_number TEXT NOT NULL,
            call_type TEXT NOT NULL CHECK (call_type IN ('waiter', 'bill')),
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'processing', 'done')),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_calls_active_table
           ON calls (table_number, created_at DESC) WHERE status <> 'done'",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_calls_created ON calls (created_at DESC)")
        .execute(pool)
        .await?;

    // Change feed: every row transition is published with the full record,
    // whichever client performed the write.
    sqlx::query(&format!(
        r#"
        CREATE OR REPLACE FUNCTION tablecall_notify_change() RETURNS trigger AS $$
        DECLARE
            rec calls;
            kind TEXT;
        BEGIN
            IF TG_OP = 'DELETE' THEN
                rec := OLD;
                kind := 'disappear';
            ELSIF TG_OP = 'INSERT' THEN
                rec := NEW;
                kind := 'appear';
            ELSE
                rec := NEW;
                kind := 'update';
            END IF;
            PERFORM pg_notify('{CHANGE_FEED_PG_CHANNEL}', json_build_object(
                'transition', kind,
                'call', json_build_object(
                    'id', rec.id,
                    'tableNumber', rec.table_number,
                    'type', rec.call_type,
                    'status', rec.status,
                    'createdAt', rec.created_at
                )
            )::text);
            RETURN NULL;
        END;
        $$ LANGUAGE plpgsql
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query("DROP TRIGGER IF EXISTS calls_notify_change ON calls").execute(pool).await?;

    sqlx::query(
        "CREATE TRIGGER calls_notify_change
           AFTER INSERT OR UPDATE OR DELETE ON calls
           FOR EACH ROW EXECUTE FUNCTION tablecall_notify_change()",
    )
    .execute(pool)
    .await?;

    tracing::debug!("PostgreSQL migrations applied");
    Ok(())
}
