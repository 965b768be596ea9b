//! Discovery endpoint.

use axum::Router;

use taxii_core::Resource;

use super::{ResourceEndpoint, html_page};
use crate::state::AppState;
use crate::topology::{DiscoveryService, ServerTopology};

/// GET {prefix}{name}/ - The Discovery resource of one service.
pub fn routes(topology: &ServerTopology, service: &DiscoveryService) -> Router<AppState> {
    let Some(discovery) = topology.discovery_resources.get(&service.resource_id) else {
        tracing::warn!(resource_id = %service.resource_id, "Discovery resource missing, skipping service");
        return Router::new();
    };

    ResourceEndpoint {
        resource: Resource::Discovery(discovery.clone()),
        page: html_page(
            &service.html,
            &service.html.branding.discovery,
            &service.name,
            &service.resource_path,
            false,
        ),
    }
    .route(&service.resource_path)
}
