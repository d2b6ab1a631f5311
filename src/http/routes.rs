//! Axum router configuration

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, StatusCode},
    middleware,
    response::Response,
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::dispatch::handle_request;
use super::middleware::request_logger;

/// Create the Axum router.
///
/// Every method and path goes to the same handler, which does its own
/// method checks and routing.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(handle_request)
        // Middleware
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

// A panicking handler becomes a 500; the listener keeps running.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Request handler panicked: {}", detail);

    let mut response = Response::new(Body::from("Internal Server Error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
