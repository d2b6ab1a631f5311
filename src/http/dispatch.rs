//! Request routing
//!
//! Single entry point for every request: validates the method, classifies
//! the path and hands off to the document or static asset responder.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;

use super::documents::serve_document;
use super::error::HttpError;
use super::static_files::serve_static;
use crate::state::AppState;

/// Value of the `Allow` header
pub const ALLOWED_METHODS: &str = "OPTIONS, GET, HEAD";

const DOCUMENT_PREFIX: &str = "/doc/";
const DOCUMENT_SUFFIX: &str = ".pdf";

/// What a request path refers to
#[derive(Debug, PartialEq, Eq)]
pub enum RequestTarget {
    /// `/doc/{token}.pdf`
    Document(String),
    /// File relative to the asset root
    Asset(PathBuf),
    /// Nothing can live here
    Unroutable,
}

/// Classify a request path
pub fn classify(path: &str) -> RequestTarget {
    if let Some(token) = path
        .strip_prefix(DOCUMENT_PREFIX)
        .and_then(|rest| rest.strip_suffix(DOCUMENT_SUFFIX))
    {
        return RequestTarget::Document(token.to_string());
    }

    match asset_path(path) {
        Some(relative) => RequestTarget::Asset(relative),
        None => RequestTarget::Unroutable,
    }
}

// Decoded, root-relative path made of plain components only.
fn asset_path(path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    let mut relative = PathBuf::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}

/// Path of a registered document
pub fn document_path(token: &str) -> String {
    format!("{}{}{}", DOCUMENT_PREFIX, token, DOCUMENT_SUFFIX)
}

/// Fallback handler mapped to every method and path
pub async fn handle_request(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    match route_request(&state, &method, uri.path(), &headers).await {
        Ok(response) => response,
        Err(HttpError::InternalError(msg)) => {
            tracing::error!("{} {} failed: {}", method, uri, msg);
            HttpError::InternalError("Internal Server Error".to_string()).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn route_request(
    state: &AppState,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
) -> Result<Response, HttpError> {
    let head_only = match *method {
        Method::GET => false,
        Method::HEAD => true,
        Method::OPTIONS => return Ok(allow_response(StatusCode::NO_CONTENT)),
        _ => return Ok(allow_response(StatusCode::METHOD_NOT_ALLOWED)),
    };

    match classify(path) {
        RequestTarget::Document(token) => match state.registry.lookup(&token) {
            Some(source) => serve_document(&state.config, source, head_only).await,
            None => {
                tracing::debug!("Unknown or expired document token {}", token);
                Err(HttpError::NotFound(path.to_string()))
            }
        },
        RequestTarget::Asset(relative) => {
            state.assets.wait().await?;
            serve_static(
                &state.config,
                state.assets.root(),
                &relative,
                head_only,
                headers,
            )
            .await?
            .ok_or_else(|| HttpError::NotFound(path.to_string()))
        }
        RequestTarget::Unroutable => Err(HttpError::NotFound(path.to_string())),
    }
}

fn allow_response(status: StatusCode) -> Response {
    let mut response = status.into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    response
}
