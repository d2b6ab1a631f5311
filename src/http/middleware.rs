//! HTTP middleware

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Request logging middleware
///
/// Logs the method, path, status and handling time of every request.
/// Query strings are left out: viewer URLs carry document tokens.
pub async fn request_logger(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_success() {
        info!("{} {} {} in {:?}", method, path, status, duration);
    } else if status.is_redirection() {
        debug!("{} {} {} in {:?}", method, path, status, duration);
    } else if status.is_client_error() {
        warn!("{} {} {} in {:?}", method, path, status, duration);
    } else {
        error!("{} {} {} in {:?}", method, path, status, duration);
    }

    response
}
