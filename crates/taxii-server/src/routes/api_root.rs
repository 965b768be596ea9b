//! API Root endpoint.

use axum::Router;

use taxii_core::Resource;

use super::{ResourceEndpoint, html_page};
use crate::state::AppState;
use crate::topology::{ApiRootService, ServerTopology};

/// GET {prefix}{name}/ - The API Root resource.
pub fn routes(topology: &ServerTopology, service: &ApiRootService) -> Router<AppState> {
    let Some(api_root) = topology.api_root_resources.get(&service.resource_id) else {
        tracing::warn!(resource_id = %service.resource_id, "API Root resource missing, skipping service");
        return Router::new();
    };

    ResourceEndpoint {
        resource: Resource::ApiRoot(api_root.clone()),
        page: html_page(
            &service.html,
            &service.html.branding.api_root,
            &service.name,
            &service.resource_path,
            false,
        ),
    }
    .route(&service.resource_path)
}
