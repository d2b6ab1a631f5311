//! Registered documents
//!
//! Documents are always served in full as `application/pdf`. There is no
//! revalidation: a token only lives as long as its registration.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use super::error::HttpError;
use crate::config::ServerConfig;
use crate::registry::DocumentSource;

/// Content type of every registered document
pub const DOCUMENT_CONTENT_TYPE: &str = "application/pdf";

/// Serve a registered document.
///
/// A stream source is opened only for GET; its stream is owned by the
/// response body and closed when the body is finished or dropped.
pub async fn serve_document(
    config: &ServerConfig,
    source: DocumentSource,
    head_only: bool,
) -> Result<Response, HttpError> {
    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, DOCUMENT_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, config.cache_control());

    match source {
        DocumentSource::File(path) => {
            let file = match File::open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!("Registered document {} is gone", path.display());
                    return Err(HttpError::NotFound(path.display().to_string()));
                }
                Err(e) => return Err(e.into()),
            };
            let length = file.metadata().await?.len();

            let body = if head_only {
                Body::empty()
            } else {
                Body::from_stream(ReaderStream::new(file))
            };
            Ok(builder.header(header::CONTENT_LENGTH, length).body(body)?)
        }
        DocumentSource::Stream(factory) => {
            if head_only {
                // Unknown-length body so HEAD and GET get the same framing
                // headers without opening the stream.
                let body = Body::from_stream(ReaderStream::new(tokio::io::empty()));
                return Ok(builder.body(body)?);
            }
            let stream = factory()?;
            Ok(builder.body(Body::from_stream(ReaderStream::new(stream)))?)
        }
    }
}
