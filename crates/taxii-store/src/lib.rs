//! taxii-store: object storage behind the TAXII server
//!
//! This crate provides:
//! - The `Datastore` contract (`get_bundle`, `get_object`) the server calls
//! - A single query evaluator shared by every backend
//! - An in-memory store loaded from a JSON seed file
//! - A SQLite store via sqlx, with embedded migrations
//!
//! # Usage
//!
//! ```rust,ignore
//! use taxii_store::{connect, StoreBackend, StoreConfig};
//!
//! let config = StoreConfig {
//!     backend: StoreBackend::Sqlite,
//!     path: Some("taxii.db".into()),
//!     ..StoreConfig::default()
//! };
//! let store = connect(&config).await?;
//! let result = store.get_bundle(&query).await?;
//! ```

pub mod datastore;
pub mod error;
pub mod evaluate;
pub mod memory;
pub mod models;
pub mod schema;
pub mod sqlite;
pub mod store;

pub use datastore::Datastore;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use models::{BundleResult, ResultRange, StoredObject};
pub use sqlite::SqliteStore;
pub use store::{StoreBackend, StoreConfig, connect};

// Re-export taxii-core for downstream crates
pub use taxii_core;
