//! SQLite object store.
//!
//! Candidate rows are fetched per collection (or per object id) and handed
//! to the shared evaluator, so filtering semantics match the in-memory store.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use taxii_core::{CollectionQuery, StixObject, timestamp};

use crate::datastore::Datastore;
use crate::error::{StoreError, StoreResult};
use crate::evaluate::{evaluate, select_object};
use crate::models::{BundleResult, StoredObject};
use crate::schema;

/// Object store backed by a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub async fn open(path: impl AsRef<Path>, max_connections: u32) -> StoreResult<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Opening SQLite object store");

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database, mostly for tests.
    ///
    /// A single connection that never expires keeps the database alive.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        schema::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace one object version.
    pub async fn insert_object(&self, record: &StoredObject) -> StoreResult<()> {
        let id = record
            .object
            .id()
            .ok_or_else(|| StoreError::InvalidRecord("object without id".to_string()))?;
        let object_type = record.object.object_type().unwrap_or_default();
        let version = record.object.version().unwrap_or_default();
        let body = serde_json::to_string(&record.object)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO objects (collection_id, id, object_type, version, date_added, body)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&record.collection_id)
        .bind(id)
        .bind(object_type)
        .bind(version)
        .bind(timestamp::format(&record.date_added))
        .bind(body)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn collection_records(&self, collection_id: &str) -> StoreResult<Vec<StoredObject>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT collection_id, date_added, body
            FROM objects
            WHERE collection_id = ?1
            "#,
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_row).collect()
    }

    async fn object_records(&self, id: &str) -> StoreResult<Vec<StoredObject>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT collection_id, date_added, body
            FROM objects
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_row).collect()
    }
}

fn decode_row((collection_id, date_added, body): (String, String, String)) -> StoreResult<StoredObject> {
    let date_added = timestamp::parse(&date_added)
        .map_err(|e| StoreError::InvalidRecord(format!("bad date_added {date_added}: {e}")))?;
    let object: StixObject = serde_json::from_str(&body)?;
    Ok(StoredObject::new(collection_id, date_added, object))
}

#[async_trait]
impl Datastore for SqliteStore {
    async fn get_bundle(&self, query: &CollectionQuery) -> StoreResult<BundleResult> {
        let records = self.collection_records(&query.collection_id).await?;
        evaluate(&records, query)
    }

    async fn get_object(
        &self,
        collection_id: Option<&str>,
        id: &str,
        version: &str,
    ) -> StoreResult<StixObject> {
        let records = self.object_records(id).await?;
        select_object(&records, collection_id, id, version)
    }
}
