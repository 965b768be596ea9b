//! Media types and `Accept` header negotiation.
//!
//! Negotiation is deliberately substring based: a client that sends
//! `application/vnd.oasis.taxii+json; version=2.0` and one that sends the bare
//! token are treated the same. Unknown tokens are ignored.
//!
//! Precedence when several capabilities match is fixed:
//! protocol media type, then generic JSON, then HTML.

use std::fmt;

/// Token identifying the TAXII protocol media type.
pub const TAXII_MEDIA_TYPE: &str = "application/vnd.oasis.taxii+json";

/// Token identifying the STIX media type.
pub const STIX_MEDIA_TYPE: &str = "application/vnd.oasis.stix+json";

/// Protocol version advertised with the versioned media types.
pub const TAXII_VERSION: &str = "version=2.0";

/// Token for generic JSON.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Token for HTML.
pub const HTML_MEDIA_TYPE: &str = "text/html";

/// Full `Content-Type` for TAXII resources.
pub const CONTENT_TYPE_TAXII: &str = "application/vnd.oasis.taxii+json; version=2.0; charset=utf-8";

/// Full `Content-Type` for STIX bundles and objects.
pub const CONTENT_TYPE_STIX: &str = "application/vnd.oasis.stix+json; version=2.0; charset=utf-8";

/// Full `Content-Type` for generic JSON.
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Full `Content-Type` for HTML.
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

/// The protocol-versioned media type an endpoint speaks.
///
/// Discovery, API Root and Collection endpoints speak TAXII; the objects
/// endpoints speak STIX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Taxii,
    Stix,
}

impl MediaKind {
    /// Token matched against the `Accept` header.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Taxii => TAXII_MEDIA_TYPE,
            Self::Stix => STIX_MEDIA_TYPE,
        }
    }

    /// `Content-Type` written when this media type wins negotiation.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Taxii => CONTENT_TYPE_TAXII,
            Self::Stix => CONTENT_TYPE_STIX,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Capabilities a client advertised in its `Accept` header.
///
/// Several flags can be set at once; use [`AcceptCapabilities::negotiate`] to
/// apply the precedence order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcceptCapabilities {
    /// The endpoint's protocol-versioned media type was present.
    pub versioned: bool,
    /// `application/json` was present.
    pub json: bool,
    /// `text/html` was present.
    pub html: bool,
}

impl AcceptCapabilities {
    /// Parse a raw `Accept` header value for an endpoint speaking `kind`.
    #[must_use]
    pub fn parse(accept: &str, kind: MediaKind) -> Self {
        Self {
            versioned: accept.contains(kind.token()),
            json: accept.contains(JSON_MEDIA_TYPE),
            html: accept.contains(HTML_MEDIA_TYPE),
        }
    }

    /// True when no known media type matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.versioned || self.json || self.html)
    }

    /// Pick the response format.
    ///
    /// HTML is only eligible when `html_enabled` is set for the service.
    /// Returns `None` when nothing acceptable remains, which callers answer
    /// with 415.
    #[must_use]
    pub fn negotiate(&self, kind: MediaKind, html_enabled: bool) -> Option<ResponseFormat> {
        if self.versioned {
            Some(ResponseFormat::Versioned(kind))
        } else if self.json {
            Some(ResponseFormat::Json)
        } else if self.html && html_enabled {
            Some(ResponseFormat::Html)
        } else {
            None
        }
    }
}

/// A negotiated response format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Compact JSON with the protocol media type.
    Versioned(MediaKind),
    /// Indented JSON with `application/json`.
    Json,
    /// Rendered HTML page.
    Html,
}

impl ResponseFormat {
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Versioned(kind) => kind.content_type(),
            Self::Json => CONTENT_TYPE_JSON,
            Self::Html => CONTENT_TYPE_HTML,
        }
    }
}
