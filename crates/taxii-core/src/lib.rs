//! taxii-core: protocol types for the TAXII server
//!
//! This crate provides:
//! - TAXII resources (Discovery, API Root, Collections, Collection, Error)
//! - STIX bundles and objects as carried on the wire
//! - `Accept` header negotiation and the fixed format precedence
//! - Collection queries built from URL parameters, bounded by a server limit
//!
//! Nothing in here performs I/O.

pub mod media;
pub mod query;
pub mod resources;
pub mod timestamp;

pub use media::{AcceptCapabilities, MediaKind, ResponseFormat};
pub use query::{
    CollectionQuery, ItemRange, ParameterError, ParameterErrors, QueryBuilder, VersionSelector,
};
pub use resources::{
    ApiRoot, Bundle, Collection, Collections, Discovery, Resource, StixObject, TaxiiError,
};
