//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Registered documents (token registry)
//! - The viewer asset extractor and its completion barrier
//! - Server configuration

use std::sync::Arc;

use crate::assets::AssetExtractor;
use crate::config::ServerConfig;
use crate::registry::DocumentRegistry;

/// Application state shared across all handlers
pub struct AppState {
    /// Registered documents (token -> source)
    pub registry: DocumentRegistry,

    /// Extracted viewer application
    pub assets: Arc<AssetExtractor>,

    /// Server configuration
    pub config: ServerConfig,
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: ServerConfig, assets: Arc<AssetExtractor>) -> Self {
        Self {
            registry: DocumentRegistry::new(config.document_ttl()),
            assets,
            config,
        }
    }
}
