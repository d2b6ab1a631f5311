//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with a single catch-all handler
//! - Method checks and path classification
//! - Registered documents (`/doc/{token}.pdf`)
//! - Static viewer assets with conditional GET and byte ranges
//! - Request logging middleware

pub mod dispatch;
pub mod documents;
pub mod error;
pub mod headers;
pub mod middleware;
pub mod range;
pub mod routes;
pub mod static_files;

pub use dispatch::document_path;
pub use error::HttpError;
pub use routes::create_router;
