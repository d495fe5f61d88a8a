use sqlx::SqlitePool;
use tracing::debug;

use crate::config::Config;
use crate::db;
use crate::error::Result;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the metadata tables if they are missing. Idempotent.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Schemaless documents. `key` is only set for singleton records such as
    // the id counter, so that they can be upserted atomically.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta_documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            key TEXT UNIQUE,
            body TEXT NOT NULL CHECK (json_valid(body))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_meta_documents_type ON meta_documents(json_extract(body, '$.type'))",
    )
    .execute(pool)
    .await?;

    debug!("metadata schema is up to date");
    Ok(())
}
