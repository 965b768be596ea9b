//! Response rendering.
//!
//! One procedure serves every endpoint: negotiate a format from `Accept`, then
//! write the mapped resource as versioned JSON, indented JSON or HTML. All
//! headers are settled before the body is produced.

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use minijinja::Environment;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use taxii_core::{AcceptCapabilities, MediaKind, ResponseFormat};

use crate::error::{RenderError, RenderResult};
use crate::mapper::{MappedResponse, STRICT_TRANSPORT_SECURITY};

/// What an HTML page is rendered with.
#[derive(Debug, Clone)]
pub struct HtmlPage {
    /// Full path of the template file, read on every request.
    pub template: PathBuf,
    /// Pass the resource as an indented JSON string instead of a structure.
    pub embed_json: bool,
    /// Exposed to the template as `service`.
    pub service: ServiceView,
}

/// Service details exposed to templates.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceView {
    pub name: String,
    pub path: String,
}

/// Pick a response format for the request.
///
/// HTML is only eligible when the endpoint has a page configured.
pub fn negotiate(headers: &HeaderMap, kind: MediaKind, page: Option<&HtmlPage>) -> Option<ResponseFormat> {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let capabilities = AcceptCapabilities::parse(accept, kind);
    let format = capabilities.negotiate(kind, page.is_some());
    if format.is_none() {
        tracing::debug!(accept, "No acceptable media type");
    }
    format
}

/// Negotiate, then render. Answers 415 when nothing acceptable remains.
pub async fn negotiate_and_render(
    headers: &HeaderMap,
    kind: MediaKind,
    page: Option<&HtmlPage>,
    mapped: MappedResponse,
) -> Response {
    match negotiate(headers, kind, page) {
        Some(format) => render(format, mapped, page).await,
        None => unsupported_media_type(),
    }
}

/// Render a mapped resource in an already negotiated format.
pub async fn render(format: ResponseFormat, mapped: MappedResponse, page: Option<&HtmlPage>) -> Response {
    let body = match format {
        ResponseFormat::Versioned(_) => serde_json::to_vec(&mapped.resource).map_err(RenderError::from),
        ResponseFormat::Json => to_pretty_json(&mapped.resource).map(String::into_bytes),
        ResponseFormat::Html => match page {
            Some(page) => render_html(page, &mapped).await.map(String::into_bytes),
            None => Err(RenderError::MissingTemplate),
        },
    };

    match body {
        Ok(body) => {
            let mut response = (mapped.status, mapped.headers, Body::from(body)).into_response();
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(format.content_type()));
            response
        }
        Err(e) => {
            tracing::error!(error = %e, resource = mapped.resource.kind(), "Failed to render response");
            empty_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// 415 with an empty body.
pub fn unsupported_media_type() -> Response {
    empty_response(StatusCode::UNSUPPORTED_MEDIA_TYPE)
}

fn empty_response(status: StatusCode) -> Response {
    (
        status,
        [(header::STRICT_TRANSPORT_SECURITY, STRICT_TRANSPORT_SECURITY)],
    )
        .into_response()
}

/// Four-space indented JSON.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> RenderResult<String> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    // serde_json only emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn render_html(page: &HtmlPage, mapped: &MappedResponse) -> RenderResult<String> {
    let source = tokio::fs::read_to_string(&page.template)
        .await
        .map_err(|source| RenderError::TemplateIo {
            path: page.template.clone(),
            source,
        })?;

    let resource = if page.embed_json {
        serde_json::Value::String(to_pretty_json(&mapped.resource)?)
    } else {
        serde_json::to_value(&mapped.resource)?
    };
    let context = serde_json::json!({
        "resource": resource,
        "service": page.service,
        "status": mapped.status.as_u16(),
    });

    // The .html name turns on auto-escaping.
    let mut env = Environment::new();
    env.add_template("page.html", &source)?;
    let template = env.get_template("page.html")?;
    Ok(template.render(context)?)
}
