//! Document preview server
//!
//! An embeddable, loopback-only HTTP server for previewing documents in an
//! embedded browser view. It serves a bundled web viewer from a temporary
//! directory and exposes registered documents through short-lived,
//! unguessable URLs:
//!
//! - `GET/HEAD /doc/{token}.pdf` serves a registered document
//! - `GET/HEAD` on any other path serves a viewer asset, with
//!   `If-Modified-Since` and single byte-range support
//! - `OPTIONS` answers `204` with the allowed methods, anything else `405`

pub mod assets;
pub mod config;
pub mod config_file;
pub mod error;
pub mod http;
pub mod registry;
pub mod server;
pub mod state;


pub use assets::AssetBundle;
pub use config::ServerConfig;
pub use config_file::ConfigFile;
pub use error::{AssetError, Result, ServerError};
pub use registry::{DocumentSource, DocumentStream, StreamFactory};
pub use server::PreviewServer;
