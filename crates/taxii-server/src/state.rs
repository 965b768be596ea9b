//! Application state shared across handlers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use taxii_core::{CollectionQuery, StixObject};
use taxii_store::{BundleResult, Datastore, StoreError, StoreResult};

use crate::mapper::ResultMapper;
use crate::topology::ServerTopology;

/// Application state shared across all handlers.
///
/// This is cloneable and can be extracted in handlers using `State<AppState>`.
/// The topology is read-only after start-up; the datastore handles its own
/// concurrency.
#[derive(Clone)]
pub struct AppState {
    /// Verified server topology.
    topology: Arc<ServerTopology>,
    /// Object store.
    store: Arc<dyn Datastore>,
    /// Datastore results to responses.
    mapper: ResultMapper,
    /// Upper bound on a single datastore call.
    datastore_timeout: Option<Duration>,
}

impl AppState {
    /// Create new application state.
    pub fn new(topology: ServerTopology, store: Arc<dyn Datastore>) -> Self {
        let mapper = ResultMapper::new(topology.global.error_status);
        let datastore_timeout = topology.global.datastore_timeout_secs.map(Duration::from_secs);
        Self {
            topology: Arc::new(topology),
            store,
            mapper,
            datastore_timeout,
        }
    }

    /// Get a reference to the server topology.
    pub fn topology(&self) -> &ServerTopology {
        &self.topology
    }

    /// Get the result mapper.
    pub fn mapper(&self) -> ResultMapper {
        self.mapper
    }

    /// Run a collection query against the datastore.
    pub async fn get_bundle(&self, query: &CollectionQuery) -> StoreResult<BundleResult> {
        self.with_timeout(self.store.get_bundle(query)).await
    }

    /// Fetch one object version stored in a collection.
    pub async fn get_object(&self, collection_id: &str, id: &str, version: &str) -> StoreResult<StixObject> {
        self.with_timeout(self.store.get_object(Some(collection_id), id, version))
            .await
    }

    async fn with_timeout<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        match self.datastore_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(StoreError::Timeout(limit.as_secs()))),
            None => call.await,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("topology", &self.topology)
            .field("datastore_timeout", &self.datastore_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use taxii_core::QueryBuilder;
    use taxii_store::MemoryStore;

    use crate::topology::tests::sample;

    struct SlowStore;

    #[async_trait]
    impl Datastore for SlowStore {
        async fn get_bundle(&self, _query: &CollectionQuery) -> StoreResult<BundleResult> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(BundleResult::empty())
        }

        async fn get_object(
            &self,
            _collection_id: Option<&str>,
            id: &str,
            version: &str,
        ) -> StoreResult<StixObject> {
            Err(StoreError::ObjectNotFound {
                id: id.to_string(),
                version: version.to_string(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_datastore_timeout() {
        let mut topology = sample();
        topology.global.datastore_timeout_secs = Some(2);
        let state = AppState::new(topology, Arc::new(SlowStore));

        let err = state
            .get_bundle(&QueryBuilder::new("c1", 50).build())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(2)));
    }

    #[tokio::test]
    async fn test_without_timeout_passes_through() {
        let state = AppState::new(sample(), Arc::new(MemoryStore::new()));
        let err = state.get_object("c1", "indicator--1", "last").await.unwrap_err();
        assert!(matches!(err, StoreError::ObjectNotFound { .. }));
    }
}
