//! Error types for the preview server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised while unpacking the viewer asset bundle
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Asset archive not found: {0}")]
    MissingArchive(PathBuf),

    #[error("Extraction task failed: {0}")]
    TaskFailed(String),
}

/// Main error type for the preview server
#[derive(Error, Debug)]
pub enum ServerError {
    /// Extraction outcome, shared by every caller waiting on the barrier
    #[error("Asset extraction failed: {0}")]
    Assets(#[from] Arc<AssetError>),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server is not running")]
    NotRunning,

    #[error("Server has been stopped and its assets removed")]
    Closed,

    #[error("Not a readable document file: {0}")]
    InvalidDocument(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ServerError>;
