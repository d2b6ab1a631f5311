//! HTTP error type

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::ServerError;

/// Failure of a request, rendered as a plain-text status response
#[derive(Debug)]
pub enum HttpError {
    NotFound(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            HttpError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        HttpError::InternalError(format!("IO error: {}", err))
    }
}

impl From<ServerError> for HttpError {
    fn from(err: ServerError) -> Self {
        HttpError::InternalError(err.to_string())
    }
}

impl From<axum::http::Error> for HttpError {
    fn from(err: axum::http::Error) -> Self {
        HttpError::InternalError(format!("Failed to build response: {}", err))
    }
}
