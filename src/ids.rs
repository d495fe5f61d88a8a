//! Content identifier allocation.
//!
//! Identifiers come from a singleton counter document (`name = "max_id"`)
//! in the metadata store. Each allocation increments and persists the
//! counter in one UPSERT statement, so two allocations can never observe
//! the same value, even across processes sharing the database file.
//! Identifiers are never handed back: a failed create leaves a gap.

use std::sync::Arc;

use sqlx::Row;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::meta::MetaStore;

/// Logical key of the counter document.
pub const COUNTER_KEY: &str = "max_id";

#[derive(Clone)]
pub struct IdAllocator {
    store: MetaStore,
    // Serializes allocations within this process so that pool connections
    // do not contend for the SQLite write lock.
    lock: Arc<Mutex<()>>,
}

impl IdAllocator {
    pub fn new(store: MetaStore) -> Self {
        Self {
            store,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Current maximum allocated id, creating the counter at 0 if absent.
    pub async fn current_max(&self) -> Result<u64> {
        let _guard = self.lock.lock().await;
        sqlx::query(
            r#"
            INSERT INTO meta_documents (key, body)
            VALUES (?1, json_object('name', ?1, 'val', 0))
            ON CONFLICT(key) DO NOTHING
            "#,
        )
        .bind(COUNTER_KEY)
        .execute(self.store.pool())
        .await?;

        let row = sqlx::query(
            "SELECT json_extract(body, '$.val') AS val FROM meta_documents WHERE key = ?",
        )
        .bind(COUNTER_KEY)
        .fetch_one(self.store.pool())
        .await?;
        counter_value(&row)
    }

    /// Allocate the next id. The incremented counter is persisted before
    /// this returns.
    pub async fn next_id(&self) -> Result<u64> {
        let _guard = self.lock.lock().await;
        let row = sqlx::query(
            r#"
            INSERT INTO meta_documents (key, body)
            VALUES (?1, json_object('name', ?1, 'val', 1))
            ON CONFLICT(key) DO UPDATE SET
                body = json_set(body, '$.val', json_extract(body, '$.val') + 1)
            RETURNING json_extract(body, '$.val') AS val
            "#,
        )
        .bind(COUNTER_KEY)
        .fetch_one(self.store.pool())
        .await?;

        let id = counter_value(&row)?;
        debug!(id, "allocated content id");
        Ok(id)
    }
}

fn counter_value(row: &sqlx::sqlite::SqliteRow) -> Result<u64> {
    let val: Option<i64> = row.try_get("val")?;
    match val {
        Some(v) if v >= 0 => Ok(v as u64),
        other => Err(Error::StoreUnavailable(format!(
            "corrupt id counter: {:?}",
            other
        ))),
    }
}
