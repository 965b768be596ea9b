//! Store selection and connection.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::datastore::Datastore;
use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryStore;
use crate::sqlite::SqliteStore;

/// Which backend holds the objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON seed file loaded into memory.
    #[default]
    Memory,
    /// SQLite database file.
    Sqlite,
}

/// Configuration for opening the object store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Seed file (memory) or database file (sqlite).
    pub path: Option<PathBuf>,
    /// Maximum number of pooled connections (sqlite only).
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: None,
            max_connections: 5,
        }
    }
}

/// Open the configured store.
///
/// A memory store without a seed file starts empty; a sqlite store needs a
/// path.
pub async fn connect(config: &StoreConfig) -> StoreResult<Arc<dyn Datastore>> {
    match (config.backend, &config.path) {
        (StoreBackend::Memory, Some(path)) => Ok(Arc::new(MemoryStore::load(path).await?)),
        (StoreBackend::Memory, None) => {
            tracing::warn!("No seed file configured, starting with an empty in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        (StoreBackend::Sqlite, Some(path)) => {
            Ok(Arc::new(SqliteStore::open(path, config.max_connections).await?))
        }
        (StoreBackend::Sqlite, None) => Err(StoreError::Config(
            "sqlite backend requires a database file".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxii_core::QueryBuilder;

    #[test]
    fn test_backend_deserialize() {
        let backend: StoreBackend = serde_json::from_str("\"sqlite\"").unwrap();
        assert_eq!(backend, StoreBackend::Sqlite);
        assert!(serde_json::from_str::<StoreBackend>("\"postgres\"").is_err());
    }

    #[tokio::test]
    async fn test_connect_empty_memory_store() {
        let store = connect(&StoreConfig::default()).await.unwrap();
        let err = store
            .get_bundle(&QueryBuilder::new("c1", 10).build())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn test_connect_sqlite_requires_path() {
        let config = StoreConfig {
            backend: StoreBackend::Sqlite,
            ..StoreConfig::default()
        };
        assert!(matches!(connect(&config).await, Err(StoreError::Config(_))));
    }
}
