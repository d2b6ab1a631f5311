//! `Range` header parsing
//!
//! Understands the classic `bytes=start-end`, `bytes=start-` and
//! `bytes=-suffix` forms. Parsing is permissive: fragments that do not
//! carry a number are dropped instead of rejecting the whole header.
//! Bounds are checked by the caller against the resource length.

use std::str::FromStr;

// helper.
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

/// Inclusive byte offsets into a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered; only meaningful when satisfiable
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `0 <= start <= end <= length - 1`
    pub fn is_satisfiable(&self, length: u64) -> bool {
        self.start <= self.end && self.end < length
    }

    /// `Content-Range` value for a 206 response
    pub fn content_range(&self, length: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, length)
    }
}

/// `Content-Range` value for a 416 response
pub fn unsatisfied_range(length: u64) -> String {
    format!("bytes */{}", length)
}

/// Parse a `Range` header value for a resource of `length` bytes.
///
/// Returns `None` when the header is absent, blank, has no `=`, or holds no
/// usable range. A suffix longer than the resource selects the whole
/// resource.
pub fn parse_range(header: Option<&str>, length: u64) -> Option<Vec<ByteRange>> {
    let value = header?.trim();
    let (_, list) = value.split_once('=')?;

    let last = length.saturating_sub(1);
    let ranges: Vec<ByteRange> = regex!(r"(\d*)-(\d*)")
        .captures_iter(list)
        .filter_map(|caps| {
            let start = number(caps.get(1).map(|m| m.as_str()));
            let end = number(caps.get(2).map(|m| m.as_str()));
            match (start, end) {
                (Some(start), Some(end)) => Some(ByteRange::new(start, end)),
                (Some(start), None) => Some(ByteRange::new(start, last)),
                (None, Some(suffix)) => Some(ByteRange::new(length.saturating_sub(suffix), last)),
                (None, None) => None,
            }
        })
        .collect();

    if ranges.is_empty() {
        None
    } else {
        Some(ranges)
    }
}

// Empty and overflowing digit runs count as absent.
fn number(digits: Option<&str>) -> Option<u64> {
    digits
        .filter(|d| !d.is_empty())
        .and_then(|d| u64::from_str(d).ok())
}
