//! The datastore contract the server talks to.

use async_trait::async_trait;

use taxii_core::{CollectionQuery, StixObject};

use crate::error::StoreResult;
use crate::models::BundleResult;

/// Read access to stored STIX objects.
///
/// Implementations own their concurrency (pooling, locking); the server calls
/// them from many requests at once through a shared `Arc<dyn Datastore>`.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Run a bounded collection query.
    async fn get_bundle(&self, query: &CollectionQuery) -> StoreResult<BundleResult>;

    /// Fetch one object version. `version` is a timestamp, `first` or `last`.
    ///
    /// With a collection, versions stored in other collections are invisible;
    /// without one the whole store is searched.
    async fn get_object(
        &self,
        collection_id: Option<&str>,
        id: &str,
        version: &str,
    ) -> StoreResult<StixObject>;
}
