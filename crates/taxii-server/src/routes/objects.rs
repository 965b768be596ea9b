//! Objects endpoints.
//!
//! The only endpoints that reach the datastore. Negotiation happens first so
//! a request nobody can answer never costs a query.

use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{HeaderMap, header},
    response::Response,
    routing::get,
};

use taxii_core::{CollectionQuery, MediaKind, QueryBuilder};

use super::{html_page, trace_headers};
use crate::render::{self, HtmlPage};
use crate::state::AppState;
use crate::topology::{ApiRootService, ServerTopology};

/// Default `match[version]` for a single object lookup.
const DEFAULT_OBJECT_VERSION: &str = "last";

type Params = Vec<(String, String)>;

/// One collection's objects.
#[derive(Debug)]
pub struct ObjectsEndpoint {
    pub collection_id: String,
    pub record_limit: usize,
    pub page: Option<HtmlPage>,
}

/// Build the objects routes for every member collection.
///
/// - GET|POST {collection}objects/ - A page of objects
/// - GET {collection}objects/{object_id}/ - One object version
pub fn routes(topology: &ServerTopology, api_root: &ApiRootService) -> Router<AppState> {
    let service = &api_root.collections;
    if !service.enabled {
        return Router::new();
    }
    let html = &api_root.html;

    let mut router = Router::new();
    for id in &service.members {
        let path = service.objects_path(id);
        let endpoint = Arc::new(ObjectsEndpoint {
            collection_id: id.clone(),
            record_limit: topology.global.max_number_of_objects,
            page: html_page(html, &html.branding.objects, &api_root.name, &path, true),
        });

        tracing::debug!(path, collection = %id, "Registering objects routes");
        router = router
            .route(
                &path,
                get(get_objects)
                    .post(get_objects)
                    .layer(Extension(endpoint.clone())),
            )
            .route(
                &format!("{path}{{object_id}}/"),
                get(get_object).layer(Extension(endpoint)),
            );
    }
    router
}

/// GET|POST - A page of objects from the collection.
async fn get_objects(
    State(state): State<AppState>,
    Extension(endpoint): Extension<Arc<ObjectsEndpoint>>,
    headers: HeaderMap,
    params: Result<Query<Params>, QueryRejection>,
) -> Response {
    tracing::info!(collection = %endpoint.collection_id, "Objects request");
    trace_headers(&headers);

    let Some(format) = render::negotiate(&headers, MediaKind::Stix, endpoint.page.as_ref()) else {
        return render::unsupported_media_type();
    };

    let params = query_params(params);
    let query = build_query(&endpoint, &headers, &params);
    tracing::debug!(?query, "Running collection query");

    let mapped = state.mapper().bundle(state.get_bundle(&query).await);
    render::render(format, mapped, endpoint.page.as_ref()).await
}

/// GET - One object version.
async fn get_object(
    State(state): State<AppState>,
    Extension(endpoint): Extension<Arc<ObjectsEndpoint>>,
    Path(object_id): Path<String>,
    headers: HeaderMap,
    params: Result<Query<Params>, QueryRejection>,
) -> Response {
    tracing::info!(collection = %endpoint.collection_id, object = %object_id, "Object request");
    trace_headers(&headers);

    let Some(format) = render::negotiate(&headers, MediaKind::Stix, endpoint.page.as_ref()) else {
        return render::unsupported_media_type();
    };

    let params = query_params(params);
    let version = params
        .iter()
        .rev()
        .find(|(key, _)| key == "match[version]")
        .map_or(DEFAULT_OBJECT_VERSION, |(_, value)| value.as_str());

    let mapped = state
        .mapper()
        .object(state.get_object(&endpoint.collection_id, &object_id, version).await);
    render::render(format, mapped, endpoint.page.as_ref()).await
}

fn query_params(params: Result<Query<Params>, QueryRejection>) -> Params {
    match params {
        Ok(Query(params)) => params,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable query string");
            Vec::new()
        }
    }
}

/// Best effort: bad parameters are logged and dropped, the rest still apply.
fn build_query(endpoint: &ObjectsEndpoint, headers: &HeaderMap, params: &[(String, String)]) -> CollectionQuery {
    let mut builder = QueryBuilder::new(endpoint.collection_id.clone(), endpoint.record_limit);

    if let Err(errors) = builder.apply_params(params) {
        for error in &errors.0 {
            tracing::warn!(collection = %endpoint.collection_id, %error, "Ignoring query parameter");
        }
    }

    if let Some(range) = headers.get(header::RANGE) {
        let applied = match range.to_str() {
            Ok(range) => builder.apply_range_header(range).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(error) = applied {
            tracing::warn!(collection = %endpoint.collection_id, %error, "Ignoring Range header");
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use taxii_core::{StixObject, media, timestamp};
    use taxii_store::{MemoryStore, StoredObject};

    use crate::routes::build_router;
    use crate::routes::tests::{app, app_with, body_json, body_string, header_str, send};
    use crate::topology::tests::sample;

    const OBJECTS: &str = "/api1/collections/c1/objects/";

    fn ids(body: &serde_json::Value) -> Vec<String> {
        body["objects"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_json_bundle_is_partial_content() {
        let response = send(app(), "GET", OBJECTS, "application/json").await;

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(header_str(&response, "content-type"), Some(media::CONTENT_TYPE_JSON));
        assert_eq!(
            header_str(&response, "x-taxii-date-added-first"),
            Some("2017-01-10T00:00:00.000Z")
        );
        assert_eq!(
            header_str(&response, "x-taxii-date-added-last"),
            Some("2017-01-12T00:00:00.000Z")
        );
        assert_eq!(header_str(&response, "content-range"), Some("items 0-2/3"));

        let text = body_string(response).await;
        assert!(text.contains("\n    \"objects\": ["));
        let body: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(body["type"], "bundle");
        assert_eq!(ids(&body), vec!["indicator--1", "malware--1", "indicator--2"]);
    }

    #[tokio::test]
    async fn test_stix_media_type_wins() {
        let response = send(
            app(),
            "GET",
            OBJECTS,
            "application/json, application/vnd.oasis.stix+json; version=2.0",
        )
        .await;

        assert_eq!(header_str(&response, "content-type"), Some(media::CONTENT_TYPE_STIX));
        assert!(!body_string(response).await.contains('\n'));
    }

    #[tokio::test]
    async fn test_taxii_media_type_not_accepted_for_objects() {
        let response = send(app(), "GET", OBJECTS, media::TAXII_MEDIA_TYPE).await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_filters_apply() {
        let response = send(
            app(),
            "GET",
            "/api1/collections/c1/objects/?match%5Btype%5D=indicator&added_after=2017-01-10T00:00:00Z",
            "application/json",
        )
        .await;

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(ids(&body_json(response).await), vec!["indicator--2"]);
    }

    #[tokio::test]
    async fn test_malformed_parameter_is_ignored() {
        let response = send(
            app(),
            "GET",
            "/api1/collections/c1/objects/?added-after=not-a-date&match%5Btype%5D=malware",
            "application/json",
        )
        .await;

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(ids(&body_json(response).await), vec!["malware--1"]);
    }

    #[tokio::test]
    async fn test_limit_is_bounded_by_server() {
        let mut topology = sample();
        topology.global.max_number_of_objects = 2;

        let response = send(
            app_with(topology),
            "GET",
            "/api1/collections/c1/objects/?limit=500",
            "application/json",
        )
        .await;

        assert_eq!(header_str(&response, "content-range"), Some("items 0-1/3"));
        assert_eq!(ids(&body_json(response).await).len(), 2);
    }

    #[tokio::test]
    async fn test_range_header() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri(OBJECTS)
                    .header(header::ACCEPT, "application/json")
                    .header(header::RANGE, "items 1-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(header_str(&response, "content-range"), Some("items 1-1/3"));
        assert_eq!(ids(&body_json(response).await), vec!["malware--1"]);
    }

    #[tokio::test]
    async fn test_empty_collection_is_not_found() {
        let response = send(app(), "GET", "/api1/collections/c2/objects/", "application/json").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(header_str(&response, "x-taxii-date-added-first").is_none());
        assert!(header_str(&response, "strict-transport-security").is_some());

        let body = body_json(response).await;
        assert!(body["title"].as_str().unwrap().starts_with("ERROR: "));
        assert!(body["description"].as_str().unwrap().contains("c2"));
        assert_eq!(body["http_status"], "404");
    }

    #[tokio::test]
    async fn test_detailed_errors() {
        let mut value = crate::topology::tests::sample_json();
        value["global"]["error_status"] = json!("detailed");
        let topology = crate::topology::ServerTopology::from_json_str(&value.to_string()).unwrap();

        let response = app_with(topology.clone())
            .oneshot(
                Request::builder()
                    .uri(OBJECTS)
                    .header(header::ACCEPT, "application/json")
                    .header(header::RANGE, "items 10-20")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);

        let response = send(
            app_with(topology),
            "GET",
            "/api1/collections/c1/objects/indicator--1/?match%5Bversion%5D=all",
            "application/json",
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["http_status"], "400");
    }

    #[tokio::test]
    async fn test_post_answers_like_get() {
        let response = send(app(), "POST", OBJECTS, "application/json").await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(ids(&body_json(response).await).len(), 3);
    }

    #[tokio::test]
    async fn test_html_disabled_is_unsupported() {
        let mut value = crate::topology::tests::sample_json();
        value["global"]["html_enabled"] = json!(false);
        let topology = crate::topology::ServerTopology::from_json_str(&value.to_string()).unwrap();

        let response = send(app_with(topology), "GET", OBJECTS, "text/html").await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_html_embeds_indented_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("custom_objects.html"), "<pre>{{ resource }}</pre>").unwrap();

        let mut topology = sample();
        topology.api_root_services[0].html.template_dir = dir.path().to_path_buf();

        let response = send(app_with(topology), "GET", OBJECTS, "text/html").await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(header_str(&response, "content-type"), Some(media::CONTENT_TYPE_HTML));

        let body = body_string(response).await;
        assert!(body.starts_with("<pre>{\n    &quot;type&quot;: &quot;bundle&quot;"));
    }

    #[tokio::test]
    async fn test_get_object() {
        let response = send(
            app(),
            "GET",
            "/api1/collections/c1/objects/malware--1/",
            media::STIX_MEDIA_TYPE,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, "content-type"), Some(media::CONTENT_TYPE_STIX));
        let body = body_json(response).await;
        assert_eq!(body["id"], "malware--1");
        assert_eq!(body["modified"], "2017-01-02T00:00:00.000Z");
    }

    #[tokio::test]
    async fn test_get_unknown_object() {
        let response = send(
            app(),
            "GET",
            "/api1/collections/c1/objects/malware--404/",
            "application/json",
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["description"].as_str().unwrap().contains("malware--404"));
    }

    #[tokio::test]
    async fn test_object_in_other_collection_is_not_found() {
        let store = MemoryStore::from_records(vec![StoredObject::new(
            "c2",
            timestamp::parse("2017-01-11T00:00:00.000Z").unwrap(),
            StixObject::new(json!({
                "type": "malware",
                "id": "malware--secret",
                "created": "2017-01-01T00:00:00.000Z",
                "modified": "2017-01-02T00:00:00.000Z",
            })),
        )]);
        let app = build_router(AppState::new(sample(), Arc::new(store)));

        let response = send(
            app.clone(),
            "GET",
            "/api1/collections/c1/objects/malware--secret/",
            "application/json",
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["title"].as_str().unwrap().starts_with("ERROR:"));
        assert!(body.get("id").is_none());

        let response = send(
            app,
            "GET",
            "/api1/collections/c2/objects/malware--secret/",
            "application/json",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], "malware--secret");
    }
}
