//! Error types for the storage layer.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No records exist for the collection.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The query matched nothing in an existing collection.
    #[error("no records returned for collection {0}")]
    NoResults(String),

    /// No object with this id and version.
    #[error("object not found: {id} (version {version})")]
    ObjectNotFound { id: String, version: String },

    /// Requested range starts past the end of the result set.
    #[error("range starting at {begin} is beyond the {total} available records")]
    RangeNotSatisfiable { begin: usize, total: usize },

    /// The query cannot be evaluated as given.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A stored record could not be decoded.
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),

    /// The datastore did not answer in time.
    #[error("datastore timed out after {0} seconds")]
    Timeout(u64),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Seed file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether the error means "the thing asked for is not there", as opposed
    /// to a malformed request or a failing backend.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CollectionNotFound(_)
                | Self::NoResults(_)
                | Self::ObjectNotFound { .. }
        )
    }

    /// Whether the error was caused by the request rather than the store.
    #[must_use]
    pub fn is_invalid_query(&self) -> bool {
        matches!(self, Self::InvalidQuery(_))
    }
}
