//! Server configuration

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Document registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Idle lifetime of a registered document in seconds (sliding)
    pub ttl_secs: u64,

    /// How often expired registrations are swept, in seconds
    pub purge_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 1800,          // 30 minutes
            purge_interval_secs: 60,
        }
    }
}

/// Viewer asset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Zip archive holding the viewer web application
    pub archive: Option<PathBuf>,

    /// Directory the archive is unpacked into (temp dir when unset)
    pub root: Option<PathBuf>,

    /// Viewer page that document URLs point at
    pub viewer_page: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            archive: None,
            root: None,
            viewer_page: "/web/viewer.html".to_string(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Loopback port to listen on (0 lets the OS pick one)
    pub port: u16,

    /// Honour `Range` requests on static assets
    pub enable_ranges: bool,

    /// `max-age` for served content, also the `Expires` offset
    pub cache_max_age_secs: u64,

    /// Document registry configuration
    pub documents: RegistryConfig,

    /// Viewer asset configuration
    pub assets: AssetConfig,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            enable_ranges: true,
            cache_max_age_secs: 86400,
            documents: RegistryConfig::default(),
            assets: AssetConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// IPv4 loopback address to bind; `::1` on the same port is added when
    /// available
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.port))
    }

    /// Sliding lifetime of registered documents
    pub fn document_ttl(&self) -> Duration {
        Duration::from_secs(self.documents.ttl_secs)
    }

    /// Interval of the expired-registration sweep
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.documents.purge_interval_secs.max(1))
    }

    /// `Cache-Control` value for served content
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_max_age_secs)
    }

    /// Directory the viewer assets are unpacked into.
    ///
    /// Without an explicit root this is a fresh directory under the system
    /// temp dir, unique per process and per server instance.
    pub fn asset_root(&self) -> PathBuf {
        match &self.assets.root {
            Some(root) => root.clone(),
            None => {
                let nonce = uuid::Uuid::new_v4().simple().to_string();
                std::env::temp_dir().join(format!(
                    "doc-preview-{}-{}",
                    std::process::id(),
                    &nonce[..8]
                ))
            }
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
