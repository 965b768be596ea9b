//! Route definitions for the TAXII endpoints.
//!
//! Routes are derived from the verified topology at start-up: one Discovery
//! route per discovery service, and per API Root the API Root, Collections,
//! Collection, Objects and Object routes. Each route carries its endpoint
//! description as an `Extension`, so handlers never look anything up.

pub mod api_root;
pub mod collections;
pub mod discovery;
pub mod objects;

use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::State,
    http::{HeaderMap, Uri},
    response::Response,
    routing::get,
};

use taxii_core::{MediaKind, Resource};

use crate::render::{self, HtmlPage, ServiceView};
use crate::state::AppState;
use crate::topology::HtmlSettings;

/// A configured resource served from a fixed path.
#[derive(Debug)]
pub struct ResourceEndpoint {
    pub resource: Resource,
    pub page: Option<HtmlPage>,
}

impl ResourceEndpoint {
    /// A `GET` route serving this resource.
    pub fn route(self, path: &str) -> Router<AppState> {
        tracing::debug!(path, resource = self.resource.kind(), "Registering route");
        Router::new().route(path, get(serve_resource).layer(Extension(Arc::new(self))))
    }
}

/// Build the complete router with all routes.
pub fn build_router(state: AppState) -> Router {
    let router = {
        let topology = state.topology();
        let mut router = Router::new();

        for service in topology.enabled_discovery_services() {
            router = router.merge(discovery::routes(topology, service));
        }
        for api_root in topology.enabled_api_root_services() {
            router = router
                .merge(api_root::routes(topology, api_root))
                .merge(collections::routes(topology, api_root))
                .merge(objects::routes(topology, api_root));
        }
        router
    };

    router.fallback(not_found).with_state(state)
}

/// GET - Any configured resource.
async fn serve_resource(
    State(state): State<AppState>,
    Extension(endpoint): Extension<Arc<ResourceEndpoint>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    tracing::info!(path = uri.path(), resource = endpoint.resource.kind(), "Serving resource");
    trace_headers(&headers);

    let mapped = state.mapper().resource(endpoint.resource.clone());
    render::negotiate_and_render(&headers, MediaKind::Taxii, endpoint.page.as_ref(), mapped).await
}

/// Anything no route serves.
async fn not_found(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    tracing::info!(path = uri.path(), "No resource at path");
    trace_headers(&headers);

    let mapped = state.mapper().not_found(uri.path());
    render::negotiate_and_render(&headers, MediaKind::Taxii, None, mapped).await
}

/// Dump request headers at trace level.
pub(crate) fn trace_headers(headers: &HeaderMap) {
    if tracing::enabled!(tracing::Level::TRACE) {
        for (name, value) in headers {
            tracing::trace!(header = %name, value = ?value, "Request header");
        }
    }
}

/// The HTML page for an endpoint, if the service has HTML on and a template
/// for this resource kind.
pub(crate) fn html_page(
    html: &HtmlSettings,
    file_name: &str,
    service_name: &str,
    path: &str,
    embed_json: bool,
) -> Option<HtmlPage> {
    html.template(file_name).map(|template| HtmlPage {
        template,
        embed_json,
        service: ServiceView {
            name: service_name.to_string(),
            path: path.to_string(),
        },
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use taxii_core::{StixObject, media, timestamp};
    use taxii_store::{MemoryStore, StoredObject};

    use crate::topology::ServerTopology;
    use crate::topology::tests::sample;

    fn record(id: &str, kind: &str, modified: &str, added: &str) -> StoredObject {
        StoredObject::new(
            "c1",
            timestamp::parse(added).unwrap(),
            StixObject::new(json!({
                "type": kind,
                "id": id,
                "created": "2017-01-01T00:00:00.000Z",
                "modified": modified,
            })),
        )
    }

    pub(crate) fn store() -> MemoryStore {
        MemoryStore::from_records(vec![
            record("indicator--1", "indicator", "2017-01-01T00:00:00.000Z", "2017-01-10T00:00:00.000Z"),
            record("malware--1", "malware", "2017-01-02T00:00:00.000Z", "2017-01-11T00:00:00.000Z"),
            record("indicator--2", "indicator", "2017-01-03T00:00:00.000Z", "2017-01-12T00:00:00.000Z"),
        ])
    }

    pub(crate) fn app_with(topology: ServerTopology) -> Router {
        build_router(AppState::new(topology, Arc::new(store())))
    }

    pub(crate) fn app() -> Router {
        app_with(sample())
    }

    pub(crate) async fn send(app: Router, method: &str, uri: &str, accept: &str) -> Response {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::ACCEPT, accept)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    pub(crate) async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub(crate) async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    pub(crate) fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
        response.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_discovery_served_at_derived_path() {
        let response = send(app(), "GET", "/taxii2/", media::TAXII_MEDIA_TYPE).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, "content-type"), Some(media::CONTENT_TYPE_TAXII));
        assert!(header_str(&response, "strict-transport-security").is_some());
        assert_eq!(body_json(response).await["title"], "Test Discovery");
    }

    #[tokio::test]
    async fn test_configured_bogus_path_is_not_routed() {
        let response = send(app(), "GET", "/bogus/path/", "application/json").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["title"].as_str().unwrap().starts_with("ERROR:"));
        assert_eq!(body["http_status"], "404");
    }

    #[tokio::test]
    async fn test_disabled_api_root_is_not_routed() {
        let response = send(app(), "GET", "/api2/", "application/json").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_fallback_without_accept_is_unsupported() {
        let response = send(app(), "GET", "/nothing/", "image/png").await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_prefix_applies_to_every_route() {
        let mut value = crate::topology::tests::sample_json();
        value["global"]["prefix"] = json!("/freetaxii/");
        let topology = ServerTopology::from_json_str(&value.to_string()).unwrap();

        let response = send(app_with(topology.clone()), "GET", "/freetaxii/api1/", "application/json").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(app_with(topology), "GET", "/api1/", "application/json").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_html_disabled_service_is_unsupported() {
        let mut value = crate::topology::tests::sample_json();
        value["discovery_server"]["services"][0]["html_enabled"] = json!(false);
        let topology = ServerTopology::from_json_str(&value.to_string()).unwrap();

        let response = send(app_with(topology), "GET", "/taxii2/", "text/html").await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_html_discovery_page() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("discovery.html"),
            "<title>{{ resource.title }}</title><p>{{ service.name }}</p>",
        )
        .unwrap();

        let mut topology = sample();
        topology.discovery_services[0].html.template_dir = dir.path().to_path_buf();

        let response = send(app_with(topology), "GET", "/taxii2/", "text/html").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, "content-type"), Some(media::CONTENT_TYPE_HTML));
        assert_eq!(
            body_string(response).await,
            "<title>Test Discovery</title><p>taxii2</p>"
        );
    }

    #[tokio::test]
    async fn test_shipped_templates_render() {
        let templates = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates");
        let mut topology = sample();
        topology.discovery_services[0].html.template_dir = templates.clone();
        topology.api_root_services[0].html.template_dir = templates;
        topology.api_root_services[0].html.branding.objects = "objects.html".to_string();

        for path in [
            "/taxii2/",
            "/api1/",
            "/api1/collections/",
            "/api1/collections/c1/",
            "/api1/collections/c1/objects/",
        ] {
            let response = send(app_with(topology.clone()), "GET", path, "text/html").await;
            assert!(response.status().is_success(), "{path}: {}", response.status());
            assert!(body_string(response).await.starts_with("<!DOCTYPE html>"));
        }
    }

    #[tokio::test]
    async fn test_html_missing_template_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut topology = sample();
        topology.discovery_services[0].html.template_dir = dir.path().to_path_buf();

        let response = send(app_with(topology), "GET", "/taxii2/", "text/html").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.is_empty());
    }
}
