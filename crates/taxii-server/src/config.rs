//! Server configuration from environment variables.
//!
//! The environment only says where the topology file lives and overrides a
//! couple of process-level settings; everything else comes from the file
//! (see [`crate::topology`]).

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default location of the topology file.
pub const DEFAULT_CONFIG_PATH: &str = "config/taxii-server.json";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the topology file.
    pub config_path: PathBuf,
    /// Log level override (trace, debug, info, warn, error).
    pub log_level: Option<String>,
    /// Listen address override.
    pub listen: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `TAXII_CONFIG`: Topology file (default: "config/taxii-server.json")
    /// - `LOG_LEVEL`: Overrides `logging.level` from the topology file
    /// - `TAXII_LISTEN`: Overrides `global.listen` from the topology file
    pub fn from_env() -> Result<Self, ConfigError> {
        let config_path = env::var("TAXII_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let log_level = env::var("LOG_LEVEL").ok().filter(|s| !s.is_empty());

        let listen = match env::var("TAXII_LISTEN") {
            Ok(value) => Some(value.parse().map_err(|e| ConfigError::InvalidValue {
                name: "TAXII_LISTEN".to_string(),
                reason: format!("{value}: {e}"),
            })?),
            Err(_) => None,
        };

        Ok(Self {
            config_path,
            log_level,
            listen,
        })
    }
}

/// Configuration errors. These are the only errors that stop the server.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration or environment value.
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    /// The topology file could not be opened.
    #[error("cannot open configuration file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The topology file is not well-formed.
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A service or collection list names a resource that is not defined.
    #[error("unknown {kind} resource: {id}")]
    UnknownResource { kind: &'static str, id: String },

    /// Two enabled services derive the same resource path.
    #[error("duplicate resource path: {0}")]
    DuplicatePath(String),

    /// A service name or collection id cannot be used as a path segment.
    #[error("invalid path segment: {0:?}")]
    InvalidServiceName(String),
}
