//! Viewer asset bundle
//!
//! The viewer web application ships as a zip archive. It is unpacked once
//! per server into a private directory by a background task; everything
//! that reads the tree first waits on the extraction barrier.

pub mod extractor;

pub use extractor::{extract_bundle, AssetBundle, AssetExtractor};
