//! Collections and Collection endpoints.

use axum::Router;

use taxii_core::Resource;

use super::{ResourceEndpoint, html_page};
use crate::state::AppState;
use crate::topology::{ApiRootService, ServerTopology};

/// Build the Collections route and one Collection route per member.
///
/// - GET {api-root}collections/ - All member collections
/// - GET {api-root}collections/{id}/ - One collection
pub fn routes(topology: &ServerTopology, api_root: &ApiRootService) -> Router<AppState> {
    let service = &api_root.collections;
    if !service.enabled {
        return Router::new();
    }
    let html = &api_root.html;

    let mut router = ResourceEndpoint {
        resource: Resource::Collections(topology.collections_resource(api_root)),
        page: html_page(
            html,
            &html.branding.collections,
            &api_root.name,
            &service.resource_path,
            false,
        ),
    }
    .route(&service.resource_path);

    for id in &service.members {
        let Some(collection) = topology.collection_resources.get(id) else {
            tracing::warn!(collection = %id, "Collection resource missing, skipping");
            continue;
        };
        let path = service.collection_path(id);
        let endpoint = ResourceEndpoint {
            resource: Resource::Collection(collection.clone()),
            page: html_page(html, &html.branding.collection, &api_root.name, &path, false),
        };
        router = router.merge(endpoint.route(&path));
    }

    router
}
