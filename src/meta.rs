//! Embedded metadata store.
//!
//! Holds small, schemaless JSON documents (the identifier counter, user
//! records) in a single SQLite table. Lookups are conjunctions of field
//! equality tests; there are no joins or range queries.
//!
//! The store is an explicit handle: open it with [`MetaStore::open`], pass
//! it down, and release it with [`MetaStore::close`].

use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::error::{Error, Result};
use crate::migrate;

/// An untyped field → value mapping.
pub type Document = Map<String, Value>;

/// A document together with the store's own auto-increment id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDoc {
    pub id: i64,
    pub fields: Document,
}

impl StoredDoc {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Conjunction of `field == value` tests. An empty predicate matches everything.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    clauses: Vec<(String, Value)>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push((field.to_string(), value.into()));
        self
    }

    /// SQL condition plus the JSON-encoded values to bind, in order.
    ///
    /// Each clause compares the JSON type as well as the extracted value:
    /// `json_extract` maps `true` to `1` and a missing field to SQL `NULL`,
    /// which would otherwise equal an integer `1` or a JSON `null`.
    fn to_sql(&self) -> Result<(String, Vec<String>)> {
        if self.clauses.is_empty() {
            return Ok(("1 = 1".to_string(), Vec::new()));
        }
        let mut conditions = Vec::with_capacity(self.clauses.len());
        let mut binds = Vec::with_capacity(2 * self.clauses.len());
        for (field, value) in &self.clauses {
            check_field(field)?;
            conditions.push(format!(
                "(json_type(body, '$.{f}') IS json_type(?, '$') \
                 AND json_extract(body, '$.{f}') IS json_extract(?, '$'))",
                f = field
            ));
            let encoded = value.to_string();
            binds.push(encoded.clone());
            binds.push(encoded);
        }
        Ok((conditions.join(" AND "), binds))
    }
}

fn check_field(field: &str) -> Result<()> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("invalid field name: '{}'", field)))
    }
}

#[derive(Clone)]
pub struct MetaStore {
    pool: SqlitePool,
}

impl MetaStore {
    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool whose schema has already been migrated.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// First document (lowest id) matching `predicate`.
    pub async fn get(&self, predicate: &Predicate) -> Result<Option<StoredDoc>> {
        let (condition, binds) = predicate.to_sql()?;
        let sql = format!(
            "SELECT id, body FROM meta_documents WHERE {} ORDER BY id LIMIT 1",
            condition
        );
        let mut query = sqlx::query(&sql);
        for b in binds {
            query = query.bind(b);
        }
        match query.fetch_optional(&self.pool).await? {
            Some(row) => Ok(Some(row_to_doc(&row)?)),
            None => Ok(None),
        }
    }

    /// Document with the store-assigned `id`.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<StoredDoc>> {
        let row = sqlx::query("SELECT id, body FROM meta_documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_doc).transpose()
    }

    /// Every document matching `predicate`, in insertion order.
    pub async fn find(&self, predicate: &Predicate) -> Result<Vec<StoredDoc>> {
        let (condition, binds) = predicate.to_sql()?;
        let sql = format!(
            "SELECT id, body FROM meta_documents WHERE {} ORDER BY id",
            condition
        );
        let mut query = sqlx::query(&sql);
        for b in binds {
            query = query.bind(b);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_doc).collect()
    }

    /// Store a new document and return its auto-increment id.
    pub async fn insert(&self, doc: Document) -> Result<i64> {
        for field in doc.keys() {
            check_field(field)?;
        }
        let body = Value::Object(doc).to_string();
        let result = sqlx::query("INSERT INTO meta_documents (body) VALUES (?)")
            .bind(body)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Store a document under a unique logical `key`. Returns `None`, leaving
    /// the existing document untouched, if the key is already taken.
    pub async fn insert_unique(&self, key: &str, doc: Document) -> Result<Option<i64>> {
        for field in doc.keys() {
            check_field(field)?;
        }
        let body = Value::Object(doc).to_string();
        let result = sqlx::query(
            "INSERT INTO meta_documents (key, body) VALUES (?, ?) ON CONFLICT(key) DO NOTHING",
        )
        .bind(key)
        .bind(body)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            Ok(None)
        } else {
            Ok(Some(result.last_insert_rowid()))
        }
    }

    /// Set the fields of `mutation` on every matching document.
    /// Returns the number of documents changed.
    pub async fn update(&self, mutation: &Document, predicate: &Predicate) -> Result<u64> {
        if mutation.is_empty() {
            return Ok(0);
        }
        let mut setters = Vec::with_capacity(mutation.len());
        let mut values = Vec::with_capacity(mutation.len());
        for (field, value) in mutation {
            check_field(field)?;
            setters.push(format!("'$.{}', json(?)", field));
            values.push(value.to_string());
        }
        let (condition, binds) = predicate.to_sql()?;
        let sql = format!(
            "UPDATE meta_documents SET body = json_set(body, {}) WHERE {}",
            setters.join(", "),
            condition
        );
        let mut query = sqlx::query(&sql);
        for v in values.into_iter().chain(binds) {
            query = query.bind(v);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Remove every matching document. Returns how many were removed.
    pub async fn delete(&self, predicate: &Predicate) -> Result<u64> {
        let (condition, binds) = predicate.to_sql()?;
        let sql = format!("DELETE FROM meta_documents WHERE {}", condition);
        let mut query = sqlx::query(&sql);
        for b in binds {
            query = query.bind(b);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn row_to_doc(row: &sqlx::sqlite::SqliteRow) -> Result<StoredDoc> {
    let id: i64 = row.try_get("id")?;
    let body: String = row.try_get("body")?;
    match serde_json::from_str::<Value>(&body)? {
        Value::Object(fields) => Ok(StoredDoc { id, fields }),
        other => Err(Error::StoreUnavailable(format!(
            "document {} is not an object: {}",
            id, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn open_store(tmp: &TempDir) -> MetaStore {
        MetaStore::open(&Config::rooted_at(tmp.path())).await.unwrap()
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let pred = Predicate::new().eq("name", "max_id");
        assert!(store.get(&pred).await.unwrap().is_none());
        assert!(store.find(&pred).await.unwrap().is_empty());
        assert_eq!(store.delete(&pred).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_get_update_delete() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;

        let alice = store
            .insert(doc(json!({"type": "user", "username": "alice", "is_admin": true})))
            .await
            .unwrap();
        let bob = store
            .insert(doc(json!({"type": "user", "username": "bob", "is_admin": false})))
            .await
            .unwrap();
        assert!(bob > alice);

        let admins = store
            .find(&Predicate::new().eq("type", "user").eq("is_admin", true))
            .await
            .unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].id, alice);

        let changed = store
            .update(
                &doc(json!({"is_admin": true, "note": "promoted"})),
                &Predicate::new().eq("username", "bob"),
            )
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let bob_doc = store
            .get(&Predicate::new().eq("username", "bob"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bob_doc.get("is_admin"), Some(&json!(true)));
        assert_eq!(bob_doc.get("note"), Some(&json!("promoted")));

        assert_eq!(
            store.delete(&Predicate::new().eq("type", "user")).await.unwrap(),
            2
        );
        assert!(store.find(&Predicate::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_numeric_predicates() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        store.insert(doc(json!({"name": "a", "val": 3}))).await.unwrap();
        store.insert(doc(json!({"name": "b", "val": 4}))).await.unwrap();

        let hit = store
            .get(&Predicate::new().eq("val", 4))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.get("name"), Some(&json!("b")));
    }

    #[tokio::test]
    async fn test_null_predicate_does_not_match_missing_field() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        store.insert(doc(json!({"a": 1}))).await.unwrap();
        let with_null = store
            .insert(doc(json!({"a": 2, "missing": null})))
            .await
            .unwrap();

        let hits = store
            .find(&Predicate::new().eq("missing", Value::Null))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, with_null);
    }

    #[tokio::test]
    async fn test_booleans_and_integers_are_distinct() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let one = store.insert(doc(json!({"a": 1}))).await.unwrap();
        let yes = store.insert(doc(json!({"a": true}))).await.unwrap();

        let by_bool = store.find(&Predicate::new().eq("a", true)).await.unwrap();
        assert_eq!(by_bool.iter().map(|d| d.id).collect::<Vec<_>>(), vec![yes]);

        let by_int = store.find(&Predicate::new().eq("a", 1)).await.unwrap();
        assert_eq!(by_int.iter().map(|d| d.id).collect::<Vec<_>>(), vec![one]);

        assert!(store
            .get(&Predicate::new().eq("a", false))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_rejects_unsafe_field_names() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        let err = store
            .get(&Predicate::new().eq("name') OR 1=1 --", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
