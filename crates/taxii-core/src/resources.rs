//! TAXII and STIX resources as they appear on the wire.
//!
//! Discovery, API Root and Collection resources are configured by the
//! operator and served verbatim. Bundles, objects and errors are produced per
//! request.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// Configured resources
// ============================================================================

/// Discovery resource describing the API Roots a server exposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_roots: Vec<String>,
}

/// API Root resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiRoot {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub max_content_length: u64,
}

/// Collection resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub can_read: bool,
    #[serde(default)]
    pub can_write: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media_types: Vec<String>,
}

/// Collections resource: the collections an API Root exposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collections {
    #[serde(default)]
    pub collections: Vec<Collection>,
}

// ============================================================================
// Per-request resources
// ============================================================================

/// A STIX object.
///
/// Objects are carried as raw JSON. Schema validation belongs to the
/// datastore, so only the handful of properties the server needs for
/// filtering are exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StixObject(pub Value);

impl StixObject {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    fn str_property(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// The `id` property, e.g. `indicator--<uuid>`.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.str_property("id")
    }

    /// The `type` property.
    #[must_use]
    pub fn object_type(&self) -> Option<&str> {
        self.str_property("type")
    }

    /// The object version: `modified`, falling back to `created`.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.str_property("modified")
            .or_else(|| self.str_property("created"))
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// STIX bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(rename = "type")]
    pub bundle_type: String,
    pub id: String,
    pub spec_version: String,
    #[serde(default)]
    pub objects: Vec<StixObject>,
}

impl Bundle {
    /// Create a bundle with a fresh `bundle--<uuid>` identifier.
    #[must_use]
    pub fn new(objects: Vec<StixObject>) -> Self {
        Self {
            bundle_type: "bundle".to_string(),
            id: format!("bundle--{}", Uuid::new_v4()),
            spec_version: "2.0".to_string(),
            objects,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }
}

/// TAXII error message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxiiError {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// HTTP status as a string, e.g. `"404"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_details: Option<String>,
}

impl TaxiiError {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status.to_string());
        self
    }
}

/// Any resource a handler can render.
///
/// Serializes as the inner resource, without a wrapper.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resource {
    Discovery(Discovery),
    ApiRoot(ApiRoot),
    Collections(Collections),
    Collection(Collection),
    Bundle(Bundle),
    Object(StixObject),
    Error(TaxiiError),
}

impl Resource {
    /// Short name used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Discovery(_) => "discovery",
            Self::ApiRoot(_) => "api-root",
            Self::Collections(_) => "collections",
            Self::Collection(_) => "collection",
            Self::Bundle(_) => "bundle",
            Self::Object(_) => "object",
            Self::Error(_) => "error",
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}
