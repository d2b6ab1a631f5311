//! Configuration file support
//!
//! Loads server configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{AssetConfig, RegistryConfig, ServerConfig};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Document registry settings
    pub documents: Option<DocumentSettings>,
    /// Viewer asset settings
    pub assets: AssetSettings,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Loopback port to listen on (0 = OS-assigned)
    pub port: Option<u16>,
    /// Honour byte-range requests for viewer assets
    pub enable_ranges: Option<bool>,
    /// Cache lifetime for served content in seconds
    pub cache_max_age_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSettings {
    /// Idle lifetime of a document URL in seconds
    pub ttl_secs: Option<u64>,
    /// Sweep interval for expired documents in seconds
    pub purge_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSettings {
    /// Zip archive with the viewer application
    pub archive: PathBuf,
    /// Extraction directory
    pub root: Option<PathBuf>,
    /// Viewer entry page
    pub viewer_page: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        Self {
            server: ServerSettings {
                port: Some(0),
                enable_ranges: Some(true),
                cache_max_age_secs: Some(86400),
            },
            documents: Some(DocumentSettings {
                ttl_secs: Some(1800),
                purge_interval_secs: Some(60),
            }),
            assets: AssetSettings {
                archive: PathBuf::from("viewer.zip"),
                root: None,
                viewer_page: Some("/web/viewer.html".to_string()),
            },
            logging: Some(LoggingSettings {
                level: "info".to_string(),
            }),
        }
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let documents = self.documents.unwrap_or(DocumentSettings {
            ttl_secs: None,
            purge_interval_secs: None,
        });

        ServerConfig {
            port: self.server.port.unwrap_or(defaults.port),
            enable_ranges: self.server.enable_ranges.unwrap_or(defaults.enable_ranges),
            cache_max_age_secs: self
                .server
                .cache_max_age_secs
                .unwrap_or(defaults.cache_max_age_secs),
            documents: RegistryConfig {
                ttl_secs: documents.ttl_secs.unwrap_or(defaults.documents.ttl_secs),
                purge_interval_secs: documents
                    .purge_interval_secs
                    .unwrap_or(defaults.documents.purge_interval_secs),
            },
            assets: AssetConfig {
                archive: Some(self.assets.archive),
                root: self.assets.root,
                viewer_page: self
                    .assets
                    .viewer_page
                    .unwrap_or(defaults.assets.viewer_page),
            },
            log_level: self
                .logging
                .map(|l| l.level)
                .unwrap_or(defaults.log_level),
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
