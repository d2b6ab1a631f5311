//! Static viewer assets
//!
//! Serves files from the extracted asset tree with `If-Modified-Since`
//! revalidation and single byte-range support.

use std::io::SeekFrom;
use std::path::Path;

use axum::{
    body::Body,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use super::error::HttpError;
use super::headers::{content_type_for, http_date, modified_seconds, parse_http_date};
use super::range::{parse_range, unsatisfied_range, ByteRange};
use crate::config::ServerConfig;

// Keeps `Expires` arithmetic inside chrono's representable range.
const MAX_EXPIRES_SECS: u64 = i32::MAX as u64;

/// Serve `relative` from under `root`.
///
/// Returns `Ok(None)` when there is no regular file at that path.
pub async fn serve_static(
    config: &ServerConfig,
    root: &Path,
    relative: &Path,
    head_only: bool,
    request_headers: &HeaderMap,
) -> Result<Option<Response>, HttpError> {
    let path = root.join(relative);
    let mut file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!("Asset {} not available: {}", path.display(), e);
            return Ok(None);
        }
    };
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Ok(None);
    }

    let length = metadata.len();
    let last_modified = modified_seconds(metadata.modified()?);

    let since = request_headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date);
    if matches!(since, Some(since) if last_modified <= since) {
        return Ok(Some(StatusCode::NOT_MODIFIED.into_response()));
    }

    let max_age = chrono::Duration::seconds(config.cache_max_age_secs.min(MAX_EXPIRES_SECS) as i64);
    let expires = last_modified
        .checked_add_signed(max_age)
        .unwrap_or(last_modified);

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type_for(relative))
        .header(header::CACHE_CONTROL, config.cache_control())
        .header(header::LAST_MODIFIED, http_date(last_modified))
        .header(header::EXPIRES, http_date(expires));
    if config.enable_ranges {
        builder = builder.header(header::ACCEPT_RANGES, "bytes");
    }

    let range = if config.enable_ranges {
        single_range(request_headers, length)
    } else {
        None
    };

    let response = match range {
        Some(range) if !range.is_satisfiable(length) => Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, unsatisfied_range(length))
            .body(Body::empty())?,
        Some(range) => {
            let body = if head_only {
                Body::empty()
            } else {
                file.seek(SeekFrom::Start(range.start)).await?;
                Body::from_stream(ReaderStream::new(file.take(range.len())))
            };
            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_RANGE, range.content_range(length))
                .header(header::CONTENT_LENGTH, range.len())
                .body(body)?
        }
        None => {
            let body = if head_only {
                Body::empty()
            } else {
                Body::from_stream(ReaderStream::new(file))
            };
            builder
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, length)
                .body(body)?
        }
    };

    Ok(Some(response))
}

// Multi-range requests are answered with the full file.
fn single_range(headers: &HeaderMap, length: u64) -> Option<ByteRange> {
    let value = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    match parse_range(value, length) {
        Some(ranges) if ranges.len() == 1 => Some(ranges[0]),
        Some(ranges) => {
            tracing::debug!("Ignoring multi-range request ({} ranges)", ranges.len());
            None
        }
        None => None,
    }
}
