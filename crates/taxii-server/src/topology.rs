//! Server topology: Discovery services, API Roots and their Collections.
//!
//! The topology is read once at start-up from a JSON document and turned into
//! a verified, read-only value:
//!
//! - resource paths are always derived as `prefix + name + "/"` (or the
//!   service index when the name is empty); any `resource_path` in the file is
//!   discarded
//! - each Collections block lives at `<api-root path>collections/`
//! - HTML is on for a service only when the global flag, its server's flag
//!   and its own flag are all set
//! - HTML branding falls back, file by file, to the server's branding
//! - every referenced resource id must exist
//!
//! Nothing mutates a `ServerTopology` after [`ServerTopology::load`] returns.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use taxii_core::{ApiRoot, Collection, Collections, Discovery};
use taxii_store::{StoreBackend, StoreConfig};

use crate::config::ConfigError;
use crate::mapper::ErrorStatusPolicy;

// ============================================================================
// Configuration file layout
// ============================================================================

/// Template file names, one per resource kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HtmlBranding {
    pub discovery: String,
    pub api_root: String,
    pub collections: String,
    pub collection: String,
    pub objects: String,
}

impl HtmlBranding {
    /// Fill every empty file name from `parent`.
    #[must_use]
    pub fn with_fallback(&self, parent: &HtmlBranding) -> HtmlBranding {
        fn pick(own: &str, parent: &str) -> String {
            if own.is_empty() { parent } else { own }.to_string()
        }

        HtmlBranding {
            discovery: pick(&self.discovery, &parent.discovery),
            api_root: pick(&self.api_root, &parent.api_root),
            collections: pick(&self.collections, &parent.collections),
            collection: pick(&self.collection, &parent.collection),
            objects: pick(&self.objects, &parent.objects),
        }
    }
}

/// `global` section of the configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalFile {
    pub prefix: String,
    pub listen: String,
    pub db_type: StoreBackend,
    pub db_file: Option<PathBuf>,
    pub html_enabled: bool,
    pub html_template_dir: PathBuf,
    pub max_number_of_objects: usize,
    pub datastore_timeout_secs: Option<u64>,
    pub error_status: ErrorStatusPolicy,
}

impl Default for GlobalFile {
    fn default() -> Self {
        Self {
            prefix: "/".to_string(),
            listen: "127.0.0.1:8000".to_string(),
            db_type: StoreBackend::Memory,
            db_file: None,
            html_enabled: false,
            html_template_dir: PathBuf::from("templates"),
            max_number_of_objects: 50,
            datastore_timeout_secs: None,
            error_status: ErrorStatusPolicy::NotFound,
        }
    }
}

/// `logging` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `taxii_server=debug`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ServiceFile {
    enabled: bool,
    name: String,
    resource_id: String,
    /// Accepted for compatibility and always overwritten.
    resource_path: Option<String>,
    html_enabled: bool,
    html_branding: HtmlBranding,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CollectionsFile {
    enabled: bool,
    /// Accepted for compatibility and always overwritten.
    resource_path: Option<String>,
    members: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ApiRootServiceFile {
    #[serde(flatten)]
    service: ServiceFile,
    collections: CollectionsFile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ServerFile<S> {
    enabled: bool,
    html_enabled: bool,
    html_branding: HtmlBranding,
    services: Vec<S>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TopologyFile {
    global: GlobalFile,
    logging: LoggingConfig,
    discovery_server: ServerFile<ServiceFile>,
    api_root_server: ServerFile<ApiRootServiceFile>,
    discovery_resources: HashMap<String, Discovery>,
    api_root_resources: HashMap<String, ApiRoot>,
    collection_resources: HashMap<String, Collection>,
}

// ============================================================================
// Verified topology
// ============================================================================

/// Verified global settings.
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    /// Normalized URL prefix, always starting and ending with `/`.
    pub prefix: String,
    pub listen: SocketAddr,
    pub store: StoreConfig,
    pub html_enabled: bool,
    pub html_template_dir: PathBuf,
    /// Record limit ceiling for every collection query.
    pub max_number_of_objects: usize,
    pub datastore_timeout_secs: Option<u64>,
    pub error_status: ErrorStatusPolicy,
}

/// HTML settings resolved for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlSettings {
    pub enabled: bool,
    pub branding: HtmlBranding,
    pub template_dir: PathBuf,
}

impl HtmlSettings {
    /// Full path of a template, if HTML is on and the file name is set.
    #[must_use]
    pub fn template(&self, file_name: &str) -> Option<PathBuf> {
        (self.enabled && !file_name.is_empty()).then(|| self.template_dir.join(file_name))
    }
}

/// A Discovery service.
#[derive(Debug, Clone)]
pub struct DiscoveryService {
    pub enabled: bool,
    pub name: String,
    pub resource_id: String,
    /// Derived at load time.
    pub resource_path: String,
    pub html: HtmlSettings,
}

/// The Collections block of an API Root.
#[derive(Debug, Clone)]
pub struct CollectionsService {
    pub enabled: bool,
    /// Derived at load time: `<api-root path>collections/`.
    pub resource_path: String,
    pub members: Vec<String>,
}

impl CollectionsService {
    #[must_use]
    pub fn collection_path(&self, collection_id: &str) -> String {
        format!("{}{}/", self.resource_path, collection_id)
    }

    #[must_use]
    pub fn objects_path(&self, collection_id: &str) -> String {
        format!("{}objects/", self.collection_path(collection_id))
    }
}

/// An API Root service.
#[derive(Debug, Clone)]
pub struct ApiRootService {
    pub enabled: bool,
    pub name: String,
    pub resource_id: String,
    /// Derived at load time.
    pub resource_path: String,
    pub html: HtmlSettings,
    pub collections: CollectionsService,
}

/// The complete, verified server topology.
#[derive(Debug, Clone)]
pub struct ServerTopology {
    pub global: GlobalConfig,
    pub logging: LoggingConfig,
    pub discovery_services: Vec<DiscoveryService>,
    pub api_root_services: Vec<ApiRootService>,
    pub discovery_resources: HashMap<String, Discovery>,
    pub api_root_resources: HashMap<String, ApiRoot>,
    pub collection_resources: HashMap<String, Collection>,
}

impl ServerTopology {
    /// Load and verify the topology from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let topology = Self::from_reader(BufReader::new(file))?;
        tracing::debug!(path = %path.display(), ?topology, "Loaded server topology");
        Ok(topology)
    }

    /// Load and verify the topology from any JSON source.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let file: TopologyFile = serde_json::from_reader(reader)?;
        verify(file)
    }

    /// Load and verify the topology from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let file: TopologyFile = serde_json::from_str(json)?;
        verify(file)
    }

    /// The Collections resource of an API Root, built from its members.
    #[must_use]
    pub fn collections_resource(&self, api_root: &ApiRootService) -> Collections {
        Collections {
            collections: api_root
                .collections
                .members
                .iter()
                .filter_map(|id| self.collection_resources.get(id).cloned())
                .collect(),
        }
    }

    pub fn enabled_discovery_services(&self) -> impl Iterator<Item = &DiscoveryService> {
        self.discovery_services.iter().filter(|s| s.enabled)
    }

    pub fn enabled_api_root_services(&self) -> impl Iterator<Item = &ApiRootService> {
        self.api_root_services.iter().filter(|s| s.enabled)
    }
}

// ============================================================================
// Verification
// ============================================================================

fn verify(file: TopologyFile) -> Result<ServerTopology, ConfigError> {
    let global = verify_global(&file.global)?;

    let mut seen_paths = HashSet::new();

    let discovery_services = file
        .discovery_server
        .services
        .iter()
        .enumerate()
        .map(|(index, service)| {
            let enabled = file.discovery_server.enabled && service.enabled;
            let resource_path = derive_path(&global.prefix, &service.name, index, enabled)?;
            if enabled {
                require_resource(&file.discovery_resources, "discovery", &service.resource_id)?;
                claim_path(&mut seen_paths, &resource_path)?;
            }
            note_overwritten_path(service.resource_path.as_deref(), &resource_path);

            Ok(DiscoveryService {
                enabled,
                name: service.name.clone(),
                resource_id: service.resource_id.clone(),
                resource_path,
                html: resolve_html(
                    &global,
                    file.discovery_server.html_enabled,
                    &file.discovery_server.html_branding,
                    service,
                ),
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    let api_root_services = file
        .api_root_server
        .services
        .iter()
        .enumerate()
        .map(|(index, root)| {
            let service = &root.service;
            let enabled = file.api_root_server.enabled && service.enabled;
            let resource_path = derive_path(&global.prefix, &service.name, index, enabled)?;
            let collections_enabled = enabled && root.collections.enabled;

            if enabled {
                require_resource(&file.api_root_resources, "api root", &service.resource_id)?;
                claim_path(&mut seen_paths, &resource_path)?;
            }
            let collections_path = if enabled {
                format!("{resource_path}collections/")
            } else {
                String::new()
            };
            if collections_enabled {
                for member in &root.collections.members {
                    require_resource(&file.collection_resources, "collection", member)?;
                    validate_segment(member)?;
                    claim_path(&mut seen_paths, &format!("{collections_path}{member}/"))?;
                }
            }
            note_overwritten_path(service.resource_path.as_deref(), &resource_path);
            note_overwritten_path(root.collections.resource_path.as_deref(), &collections_path);

            Ok(ApiRootService {
                enabled,
                name: service.name.clone(),
                resource_id: service.resource_id.clone(),
                resource_path,
                html: resolve_html(
                    &global,
                    file.api_root_server.html_enabled,
                    &file.api_root_server.html_branding,
                    service,
                ),
                collections: CollectionsService {
                    enabled: collections_enabled,
                    resource_path: collections_path,
                    members: root.collections.members.clone(),
                },
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    Ok(ServerTopology {
        global,
        logging: file.logging,
        discovery_services,
        api_root_services,
        discovery_resources: file.discovery_resources,
        api_root_resources: file.api_root_resources,
        collection_resources: file.collection_resources,
    })
}

fn verify_global(global: &GlobalFile) -> Result<GlobalConfig, ConfigError> {
    if global.max_number_of_objects == 0 {
        return Err(ConfigError::InvalidValue {
            name: "global.max_number_of_objects".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    let listen: SocketAddr = global.listen.parse().map_err(|e| ConfigError::InvalidValue {
        name: "global.listen".to_string(),
        reason: format!("{}: {}", global.listen, e),
    })?;

    Ok(GlobalConfig {
        prefix: normalize_prefix(&global.prefix),
        listen,
        store: StoreConfig {
            backend: global.db_type,
            path: global.db_file.clone(),
            ..StoreConfig::default()
        },
        html_enabled: global.html_enabled,
        html_template_dir: global.html_template_dir.clone(),
        max_number_of_objects: global.max_number_of_objects,
        datastore_timeout_secs: global.datastore_timeout_secs,
        error_status: global.error_status,
    })
}

/// `"taxii"` → `"/taxii/"`, `""` → `"/"`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

fn derive_path(prefix: &str, name: &str, index: usize, enabled: bool) -> Result<String, ConfigError> {
    if !enabled {
        return Ok(String::new());
    }
    let segment = if name.is_empty() {
        index.to_string()
    } else {
        validate_segment(name)?;
        name.to_string()
    };
    Ok(format!("{prefix}{segment}/"))
}

/// Names become literal path segments, so they cannot contain separators or
/// route-pattern syntax.
fn validate_segment(segment: &str) -> Result<(), ConfigError> {
    let bad = segment.is_empty()
        || segment
            .chars()
            .any(|c| matches!(c, '/' | '{' | '}' | '*' | ':') || c.is_whitespace());
    if bad {
        return Err(ConfigError::InvalidServiceName(segment.to_string()));
    }
    Ok(())
}

fn require_resource<T>(
    resources: &HashMap<String, T>,
    kind: &'static str,
    id: &str,
) -> Result<(), ConfigError> {
    if resources.contains_key(id) {
        Ok(())
    } else {
        Err(ConfigError::UnknownResource {
            kind,
            id: id.to_string(),
        })
    }
}

fn claim_path(seen: &mut HashSet<String>, path: &str) -> Result<(), ConfigError> {
    if seen.insert(path.to_string()) {
        Ok(())
    } else {
        Err(ConfigError::DuplicatePath(path.to_string()))
    }
}

fn note_overwritten_path(configured: Option<&str>, derived: &str) {
    if let Some(configured) = configured.filter(|p| *p != derived) {
        tracing::debug!(configured, derived, "Ignoring configured resource path");
    }
}

fn resolve_html(
    global: &GlobalConfig,
    server_html: bool,
    server_branding: &HtmlBranding,
    service: &ServiceFile,
) -> HtmlSettings {
    HtmlSettings {
        enabled: global.html_enabled && server_html && service.html_enabled,
        branding: service.html_branding.with_fallback(server_branding),
        template_dir: global.html_template_dir.clone(),
    }
}
