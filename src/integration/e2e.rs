//! End-to-end integration tests
//!
//! Each test starts a real server on an OS-assigned port and talks to it
//! over HTTP.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::config::ServerConfig;
    use crate::error::ServerError;
    use crate::integration::fixtures::{
        sample_asset, sample_pdf, token_from_viewer_url, TestServer, VIEWER_HTML,
    };
    use crate::registry::DocumentStream;

    fn header<'a>(response: &'a reqwest::Response, name: &str) -> Option<&'a str> {
        response.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_registered_file_roundtrip() {
        let ts = TestServer::start().await;
        let pdf = sample_pdf();
        let path = ts.write_document("report.pdf", &pdf);

        let viewer_url = ts.server.register_file(&path).await.unwrap();
        let token = token_from_viewer_url(&viewer_url);

        let response = reqwest::get(ts.url(&format!("/doc/{}.pdf", token)))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(header(&response, "content-type"), Some("application/pdf"));
        assert_eq!(
            header(&response, "cache-control"),
            Some("public, max-age=86400")
        );
        let body = response.bytes().await.unwrap();
        assert_eq!(&body[..], &pdf[..]);

        ts.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_viewer_url_loads_viewer_page() {
        let ts = TestServer::start().await;
        let path = ts.write_document("a.pdf", &sample_pdf());
        let viewer_url = ts.server.register_file(&path).await.unwrap();

        assert!(viewer_url.starts_with("http://localhost:"));
        let response = reqwest::get(&viewer_url).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(header(&response, "content-type"), Some("text/html"));
        assert_eq!(&response.bytes().await.unwrap()[..], VIEWER_HTML);

        ts.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_revoked_and_expired_tokens() {
        let ts = TestServer::start().await;
        let path = ts.write_document("a.pdf", &sample_pdf());

        let response = reqwest::get(ts.url("/doc/00000000000000000000000000000000.pdf"))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);

        let token = token_from_viewer_url(&ts.server.register_file(&path).await.unwrap());
        assert!(ts.server.revoke(&token));
        let response = reqwest::get(ts.url(&format!("/doc/{}.pdf", token)))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
        ts.server.stop().await.unwrap();

        // A zero TTL expires every entry before its first lookup.
        let mut config = ServerConfig::default();
        config.documents.ttl_secs = 0;
        let ts = TestServer::start_with(config).await;
        let path = ts.write_document("b.pdf", &sample_pdf());
        let token = token_from_viewer_url(&ts.server.register_file(&path).await.unwrap());
        let response = reqwest::get(ts.url(&format!("/doc/{}.pdf", token)))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
        ts.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_asset_byte_ranges() {
        let ts = TestServer::start().await;
        let client = reqwest::Client::new();
        let asset = sample_asset();

        let response = client
            .get(ts.url("/web/data.bin"))
            .header("Range", "bytes=0-99")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 206);
        assert_eq!(header(&response, "content-range"), Some("bytes 0-99/500"));
        assert_eq!(header(&response, "accept-ranges"), Some("bytes"));
        assert_eq!(&response.bytes().await.unwrap()[..], &asset[..100]);

        let response = client
            .get(ts.url("/web/data.bin"))
            .header("Range", "bytes=600-700")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 416);
        assert_eq!(header(&response, "content-range"), Some("bytes */500"));
        assert!(response.bytes().await.unwrap().is_empty());

        let response = client
            .get(ts.url("/web/data.bin"))
            .header("Range", "bytes=-50")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 206);
        assert_eq!(header(&response, "content-range"), Some("bytes 450-499/500"));
        assert_eq!(&response.bytes().await.unwrap()[..], &asset[450..]);

        ts.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_asset_conditional_get() {
        let ts = TestServer::start().await;
        let client = reqwest::Client::new();

        let response = client.get(ts.url("/web/viewer.mjs")).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(header(&response, "content-type"), Some("text/javascript"));
        let last_modified = header(&response, "last-modified").unwrap().to_string();

        let response = client
            .get(ts.url("/web/viewer.mjs"))
            .header("If-Modified-Since", &last_modified)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 304);
        assert!(response.bytes().await.unwrap().is_empty());

        let response = client
            .get(ts.url("/web/viewer.mjs"))
            .header("If-Modified-Since", "Mon, 01 Jan 2001 00:00:00 GMT")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert!(!response.bytes().await.unwrap().is_empty());

        ts.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_methods() {
        let ts = TestServer::start().await;
        let client = reqwest::Client::new();

        let response = client
            .request(reqwest::Method::OPTIONS, ts.url("/web/viewer.html"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 204);
        assert_eq!(header(&response, "allow"), Some("OPTIONS, GET, HEAD"));

        let response = client
            .post(ts.url("/web/viewer.html"))
            .body("x")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 405);
        assert_eq!(header(&response, "allow"), Some("OPTIONS, GET, HEAD"));

        let response = client.get(ts.url("/web/")).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 404);

        ts.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_options_asterisk() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let ts = TestServer::start().await;
        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", ts.port))
            .await
            .unwrap();
        stream
            .write_all(b"OPTIONS * HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        let response = String::from_utf8_lossy(&raw).to_ascii_lowercase();
        assert!(response.starts_with("http/1.1 204"), "{}", response);
        assert!(
            response.contains("\r\nallow: options, get, head\r\n"),
            "{}",
            response
        );

        ts.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_head_matches_get() {
        let ts = TestServer::start().await;
        let client = reqwest::Client::new();

        let get = client.get(ts.url("/web/data.bin")).send().await.unwrap();
        let head = client.head(ts.url("/web/data.bin")).send().await.unwrap();
        assert_eq!(get.status(), head.status());
        for name in [
            "content-type",
            "content-length",
            "cache-control",
            "last-modified",
            "expires",
            "accept-ranges",
        ] {
            assert_eq!(header(&get, name), header(&head, name), "{}", name);
        }
        assert!(head.bytes().await.unwrap().is_empty());

        ts.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stream_documents() {
        let ts = TestServer::start().await;
        let client = reqwest::Client::new();
        let opened = Arc::new(AtomicUsize::new(0));

        let counter = opened.clone();
        let url = ts
            .server
            .register_stream(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(std::io::Cursor::new(sample_pdf())) as DocumentStream)
            })
            .await
            .unwrap();
        let doc = ts.url(&format!("/doc/{}.pdf", token_from_viewer_url(&url)));

        let response = client.head(&doc).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(header(&response, "content-type"), Some("application/pdf"));
        assert_eq!(opened.load(Ordering::SeqCst), 0);

        for expected in 1..=2 {
            let response = client.get(&doc).send().await.unwrap();
            assert_eq!(response.status().as_u16(), 200);
            assert_eq!(&response.bytes().await.unwrap()[..], &sample_pdf()[..]);
            assert_eq!(opened.load(Ordering::SeqCst), expected);
        }

        ts.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_registrations() {
        let ts = TestServer::start().await;
        let (first, second) = tokio::join!(
            ts.server.register_stream(|| {
                Ok(Box::new(std::io::Cursor::new(b"%PDF-first".to_vec())) as DocumentStream)
            }),
            ts.server.register_stream(|| {
                Ok(Box::new(std::io::Cursor::new(b"%PDF-second".to_vec())) as DocumentStream)
            }),
        );
        let first = token_from_viewer_url(&first.unwrap());
        let second = token_from_viewer_url(&second.unwrap());
        assert_ne!(first, second);

        let (a, b) = tokio::join!(
            reqwest::get(ts.url(&format!("/doc/{}.pdf", first))),
            reqwest::get(ts.url(&format!("/doc/{}.pdf", second))),
        );
        assert_eq!(&a.unwrap().bytes().await.unwrap()[..], b"%PDF-first");
        assert_eq!(&b.unwrap().bytes().await.unwrap()[..], b"%PDF-second");

        ts.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_stream_keeps_server_alive() {
        let ts = TestServer::start().await;
        let url = ts
            .server
            .register_stream(|| {
                Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "backing store unavailable",
                ))
            })
            .await
            .unwrap();

        let response = reqwest::get(ts.url(&format!("/doc/{}.pdf", token_from_viewer_url(&url))))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 500);

        let response = reqwest::get(ts.url("/web/viewer.html")).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);

        ts.server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_closes_listener_and_cleans_up() {
        let ts = TestServer::start().await;
        let root = ts.server.asset_root().to_path_buf();
        let base = ts.url("/web/viewer.html");
        assert!(root.join("web/viewer.html").is_file());

        ts.server.stop().await.unwrap();
        assert!(!root.exists());
        assert!(reqwest::get(&base).await.is_err());

        let path = ts.write_document("late.pdf", &sample_pdf());
        assert!(matches!(
            ts.server.register_file(&path).await,
            Err(ServerError::NotRunning)
        ));
    }
}
