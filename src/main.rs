//! Document preview server demo
//!
//! Starts a preview server, registers the PDF files given on the command
//! line and prints their viewer URLs until Ctrl-C.
//!
//! Usage: `doc-preview-server [config.toml] [FILE.pdf ...]`

use std::path::Path;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doc_preview_server::{AssetBundle, ConfigFile, PreviewServer, Result, ServerConfig, ServerError};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "doc-preview-server";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = if args.first().is_some_and(|a| a.ends_with(".toml")) {
        args.remove(0)
    } else {
        "config.toml".to_string()
    };

    // Load configuration
    let (config, load_error) = if Path::new(&config_path).exists() {
        match ConfigFile::from_file(&config_path) {
            Ok(cf) => (cf.into_server_config(), None),
            Err(e) => (ServerConfig::default(), Some(e.to_string())),
        }
    } else {
        (ServerConfig::default(), None)
    };

    // Initialize logging
    init_logging(&config.log_level);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(e) = load_error {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            config_path,
            e
        );
    }
    tracing::info!("Configuration loaded: {:?}", config);

    let archive = config.assets.archive.clone().ok_or_else(|| {
        ServerError::Config(format!(
            "no viewer archive configured ([assets] archive in {})",
            config_path
        ))
    })?;

    let server = PreviewServer::new(config, AssetBundle::Archive(archive));
    let port = match server.start().await {
        Ok(port) => port,
        Err(e) => {
            server.stop().await?;
            return Err(e);
        }
    };
    tracing::info!("Viewer available on http://localhost:{}/", port);

    for file in &args {
        match server.register_file(file).await {
            Ok(url) => println!("{}\t{}", file, url),
            Err(e) => tracing::error!("Cannot register {}: {}", file, e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to wait for Ctrl-C: {}", e);
    }
    tracing::info!("Shutting down");
    server.stop().await
}

/// Initialize logging with tracing
fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("doc_preview_server={},tower_http=debug", level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
