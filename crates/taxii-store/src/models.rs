//! Stored records and query results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taxii_core::{Bundle, StixObject};

/// One version of a STIX object held in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub collection_id: String,
    /// When the server added this version to the collection.
    pub date_added: DateTime<Utc>,
    pub object: StixObject,
}

impl StoredObject {
    #[must_use]
    pub fn new(
        collection_id: impl Into<String>,
        date_added: DateTime<Utc>,
        object: StixObject,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            date_added,
            object,
        }
    }

    /// Object id, or an empty string when the object carries none.
    #[must_use]
    pub fn id(&self) -> &str {
        self.object.id().unwrap_or_default()
    }
}

/// Position of a result page inside the full result set.
///
/// `first` and `last` are inclusive indexes; `total` counts every record
/// that matched the query before paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultRange {
    pub first: usize,
    pub last: usize,
    pub total: usize,
}

/// Result of [`crate::Datastore::get_bundle`].
#[derive(Debug, Clone, PartialEq)]
pub struct BundleResult {
    pub bundle: Bundle,
    /// `date_added` of the first object in the bundle.
    pub date_added_first: Option<DateTime<Utc>>,
    /// `date_added` of the last object in the bundle.
    pub date_added_last: Option<DateTime<Utc>>,
    pub range: Option<ResultRange>,
}

impl BundleResult {
    /// A result with no objects and no paging information.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            bundle: Bundle::new(Vec::new()),
            date_added_first: None,
            date_added_last: None,
            range: None,
        }
    }
}
