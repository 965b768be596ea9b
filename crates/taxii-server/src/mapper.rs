//! Datastore results to (resource, status, headers).
//!
//! Every mapped response carries `Strict-Transport-Security`. Bundles add the
//! pagination headers; errors become a TAXII Error resource whose status
//! depends on the configured [`ErrorStatusPolicy`].

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use serde::Deserialize;

use taxii_core::{Resource, StixObject, TaxiiError, timestamp};
use taxii_store::{BundleResult, StoreError, StoreResult};

/// Value of the `Strict-Transport-Security` header.
pub const STRICT_TRANSPORT_SECURITY: &str = "max-age=86400; includeSubDomains";

/// Date-added timestamp of the first object in a returned page.
pub const X_TAXII_DATE_ADDED_FIRST: HeaderName = HeaderName::from_static("x-taxii-date-added-first");

/// Date-added timestamp of the last object in a returned page.
pub const X_TAXII_DATE_ADDED_LAST: HeaderName = HeaderName::from_static("x-taxii-date-added-last");

/// How datastore failures translate to HTTP status codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatusPolicy {
    /// Every failure is 404.
    #[default]
    NotFound,
    /// Not found is 404, bad query 400, unsatisfiable range 416, the rest 500.
    Detailed,
}

/// A resource ready for rendering.
#[derive(Debug, Clone)]
pub struct MappedResponse {
    pub resource: Resource,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl MappedResponse {
    fn new(resource: Resource, status: StatusCode) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(STRICT_TRANSPORT_SECURITY),
        );
        Self {
            resource,
            status,
            headers,
        }
    }
}

/// Maps datastore outcomes onto responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultMapper {
    policy: ErrorStatusPolicy,
}

impl ResultMapper {
    #[must_use]
    pub fn new(policy: ErrorStatusPolicy) -> Self {
        Self { policy }
    }

    /// A configured resource, served as-is with 200.
    #[must_use]
    pub fn resource(&self, resource: Resource) -> MappedResponse {
        MappedResponse::new(resource, StatusCode::OK)
    }

    /// A collection query result.
    ///
    /// Success is always 206 since results are bounded by the record limit.
    #[must_use]
    pub fn bundle(&self, result: StoreResult<BundleResult>) -> MappedResponse {
        let result = match result {
            Ok(result) => result,
            Err(err) => return self.error(&err),
        };

        let mut mapped = MappedResponse::new(Resource::Bundle(result.bundle), StatusCode::PARTIAL_CONTENT);

        if let Some(first) = result.date_added_first {
            insert_header(&mut mapped.headers, X_TAXII_DATE_ADDED_FIRST, &timestamp::format(&first));
        }
        if let Some(last) = result.date_added_last {
            insert_header(&mut mapped.headers, X_TAXII_DATE_ADDED_LAST, &timestamp::format(&last));
        }
        if let Some(range) = result.range {
            insert_header(
                &mut mapped.headers,
                header::CONTENT_RANGE,
                &format!("items {}-{}/{}", range.first, range.last, range.total),
            );
        }

        mapped
    }

    /// A single object lookup.
    #[must_use]
    pub fn object(&self, result: StoreResult<StixObject>) -> MappedResponse {
        match result {
            Ok(object) => MappedResponse::new(Resource::Object(object), StatusCode::OK),
            Err(err) => self.error(&err),
        }
    }

    /// A datastore failure as a TAXII Error resource.
    #[must_use]
    pub fn error(&self, err: &StoreError) -> MappedResponse {
        let status = self.error_status(err);
        tracing::info!(error = %err, status = status.as_u16(), "Sending error response");

        let resource = TaxiiError::new(format!("ERROR: {err}"))
            .with_description(format!("The request had the following problem: {err}"))
            .with_http_status(status.as_u16());

        MappedResponse::new(Resource::Error(resource), status)
    }

    /// A path that no route serves.
    #[must_use]
    pub fn not_found(&self, path: &str) -> MappedResponse {
        let resource = TaxiiError::new("ERROR: resource not found")
            .with_description(format!("No TAXII resource is served at {path}"))
            .with_http_status(StatusCode::NOT_FOUND.as_u16());

        MappedResponse::new(Resource::Error(resource), StatusCode::NOT_FOUND)
    }

    fn error_status(&self, err: &StoreError) -> StatusCode {
        match self.policy {
            ErrorStatusPolicy::NotFound => StatusCode::NOT_FOUND,
            ErrorStatusPolicy::Detailed => {
                if err.is_not_found() {
                    StatusCode::NOT_FOUND
                } else if err.is_invalid_query() {
                    StatusCode::BAD_REQUEST
                } else if matches!(err, StoreError::RangeNotSatisfiable { .. }) {
                    StatusCode::RANGE_NOT_SATISFIABLE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }
    }
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(e) => tracing::warn!(header = %name, error = %e, "Dropping invalid header value"),
    }
}
