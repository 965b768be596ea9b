//! In-memory object store.
//!
//! Loaded from a JSON array of stored records:
//!
//! ```json
//! [
//!   {
//!     "collection_id": "91a7b528-80eb-42ed-a74d-c6fbd5a26116",
//!     "date_added": "2017-01-01T00:00:00.000Z",
//!     "object": { "type": "indicator", "id": "indicator--...", ... }
//!   }
//! ]
//! ```

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use taxii_core::{CollectionQuery, StixObject};

use crate::datastore::Datastore;
use crate::error::{StoreError, StoreResult};
use crate::evaluate::{evaluate, select_object};
use crate::models::{BundleResult, StoredObject};

/// Object store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<StoredObject>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_records(records: Vec<StoredObject>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Load records from a JSON seed file.
    pub async fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let records: Vec<StoredObject> = serde_json::from_slice(&data)?;

        for record in &records {
            if record.object.id().is_none() {
                return Err(StoreError::InvalidRecord(format!(
                    "object without id in collection {}",
                    record.collection_id
                )));
            }
        }

        tracing::info!(
            path = %path.display(),
            records = records.len(),
            "Loaded in-memory object store"
        );
        Ok(Self::from_records(records))
    }

    /// Add one record.
    pub async fn insert(&self, record: StoredObject) {
        self.records.write().await.push(record);
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn get_bundle(&self, query: &CollectionQuery) -> StoreResult<BundleResult> {
        let records = self.records.read().await;
        evaluate(records.iter(), query)
    }

    async fn get_object(
        &self,
        collection_id: Option<&str>,
        id: &str,
        version: &str,
    ) -> StoreResult<StixObject> {
        let records = self.records.read().await;
        select_object(records.iter(), collection_id, id, version)
    }
}
