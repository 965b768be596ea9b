//! taxii-server: HTTP server for TAXII Discovery, API Roots and Collections
//!
//! This crate provides:
//! - The server topology, loaded once from JSON and verified
//! - Result mapping from datastore outcomes to TAXII resources and statuses
//! - Content negotiation and rendering (versioned JSON, JSON, HTML)
//! - Routes derived from the topology
//!
//! # Architecture
//!
//! Each request runs: negotiate `Accept` → build the collection query →
//! call the datastore → map the result → render. The topology is read-only
//! after start-up and the datastore sits behind `Arc<dyn Datastore>`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use taxii_server::{AppState, ServerTopology, routes};
//!
//! let topology = ServerTopology::load("config/taxii-server.json")?;
//! let store = taxii_store::connect(&topology.global.store).await?;
//! let app = routes::build_router(AppState::new(topology, store));
//! ```

pub mod config;
pub mod error;
pub mod mapper;
pub mod middleware;
pub mod render;
pub mod routes;
pub mod state;
pub mod topology;

// Re-exports for convenience
pub use config::{ConfigError, ServerConfig};
pub use error::{RenderError, RenderResult};
pub use mapper::{ErrorStatusPolicy, MappedResponse, ResultMapper};
pub use state::AppState;
pub use topology::ServerTopology;

// Re-export dependent crates
pub use taxii_core;
pub use taxii_store;
