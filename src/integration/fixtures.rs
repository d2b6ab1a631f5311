//! Test fixtures for integration tests
//!
//! Builds a viewer bundle in memory and starts a real server on an
//! OS-assigned loopback port.

use std::path::PathBuf;

use crate::assets::extractor::tests::zip_bundle;
use crate::config::ServerConfig;
use crate::server::PreviewServer;

/// Fake viewer entry page
pub const VIEWER_HTML: &[u8] = b"<!DOCTYPE html><html><body>viewer</body></html>";

/// Bytes of a 500-byte binary asset, for range tests
pub fn sample_asset() -> Vec<u8> {
    (0..500u32).map(|i| (i * 7 % 256) as u8).collect()
}

/// Bytes of a small document
pub fn sample_pdf() -> Vec<u8> {
    let mut pdf = b"%PDF-1.7\n".to_vec();
    pdf.extend((0..2048u32).map(|i| (i % 97) as u8));
    pdf.extend_from_slice(b"\n%%EOF\n");
    pdf
}

/// A started server with its scratch directory
pub struct TestServer {
    pub dir: tempfile::TempDir,
    pub server: PreviewServer,
    pub port: u16,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    pub async fn start_with(mut config: ServerConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        config.assets.root = Some(dir.path().join("assets"));

        let asset = sample_asset();
        let bundle = zip_bundle(&[
            ("web/", b""),
            ("web/viewer.html", VIEWER_HTML),
            ("web/viewer.mjs", b"export const viewer = true;\n"),
            ("web/data.bin", asset.as_slice()),
        ]);
        let server = PreviewServer::new(config, bundle);
        let port = server.start().await.unwrap();

        Self { dir, server, port }
    }

    /// URL on the IPv4 loopback address the server is bound to
    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    /// Write a document into the scratch directory
    pub fn write_document(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }
}

/// Token from a viewer URL
pub fn token_from_viewer_url(url: &str) -> String {
    let start = url.find("%2Fdoc%2F").unwrap() + "%2Fdoc%2F".len();
    let end = url.rfind(".pdf").unwrap();
    url[start..end].to_string()
}
