//! Per-request rendering errors.

use std::path::PathBuf;

/// Failure to produce a response body.
///
/// Always confined to one request: the handler answers 500 with an empty body.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The template file could not be read.
    #[error("cannot read template {}: {source}", path.display())]
    TemplateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The template failed to compile or render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// The resource could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTML was negotiated but the service has no template for this resource.
    #[error("no HTML template configured")]
    MissingTemplate,
}

/// Result type for rendering.
pub type RenderResult<T> = Result<T, RenderError>;
