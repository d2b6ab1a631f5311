//! Host-facing server API
//!
//! [`PreviewServer`] owns the listener, the document registry and the
//! extracted viewer assets. The host registers documents and gets back a
//! viewer URL it can load in an embedded browser.

use std::net::{Ipv6Addr, SocketAddr};
use std::path::Path;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::assets::{AssetBundle, AssetExtractor};
use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::http::{create_router, document_path};
use crate::registry::{DocumentSource, DocumentStream};
use crate::state::AppState;

/// How long `stop()` waits for open connections before cutting them off
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Characters escaped in the viewer's `file` query parameter
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'/')
    .add(b'=')
    .add(b'?');

struct RunningServer {
    port: u16,
    shutdown: Vec<oneshot::Sender<()>>,
    serve_tasks: Vec<JoinHandle<std::io::Result<()>>>,
    purge_task: JoinHandle<()>,
}

impl RunningServer {
    async fn shutdown(self) {
        let RunningServer {
            port,
            shutdown,
            serve_tasks,
            purge_task,
        } = self;

        purge_task.abort();
        for signal in shutdown {
            let _ = signal.send(());
        }

        let deadline = tokio::time::Instant::now() + SHUTDOWN_TIMEOUT;
        for mut serve_task in serve_tasks {
            match tokio::time::timeout_at(deadline, &mut serve_task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => tracing::warn!("Server on port {} failed: {}", port, e),
                Ok(Err(e)) => tracing::warn!("Serve task for port {} failed: {}", port, e),
                Err(_) => {
                    tracing::warn!(
                        "Connections on port {} still open after {:?}, aborting",
                        port,
                        SHUTDOWN_TIMEOUT
                    );
                    serve_task.abort();
                }
            }
        }
        tracing::info!("Server on port {} stopped", port);
    }
}

enum Lifecycle {
    Idle,
    Running(RunningServer),
    Stopped,
}

/// Embeddable loopback document preview server
pub struct PreviewServer {
    state: Arc<AppState>,
    lifecycle: Mutex<Lifecycle>,
    port: AtomicU16,
}

impl PreviewServer {
    /// Create a server and start unpacking `bundle` in the background.
    ///
    /// Must be called from within a tokio runtime. Nothing is bound until
    /// [`start`](Self::start).
    pub fn new(config: ServerConfig, bundle: AssetBundle) -> Self {
        let root = config.asset_root();
        tracing::debug!("Unpacking viewer assets into {}", root.display());
        let assets = AssetExtractor::spawn(bundle, root);

        Self {
            state: Arc::new(AppState::new(config, assets)),
            lifecycle: Mutex::new(Lifecycle::Idle),
            port: AtomicU16::new(0),
        }
    }

    /// Wait for the assets, bind the listener and start serving.
    ///
    /// Returns the bound port. Calling this on a running server returns
    /// the existing port.
    pub async fn start(&self) -> Result<u16> {
        let mut lifecycle = self.lifecycle.lock().await;
        match &*lifecycle {
            Lifecycle::Running(running) => return Ok(running.port),
            Lifecycle::Stopped => return Err(ServerError::Closed),
            Lifecycle::Idle => {}
        }

        self.state.assets.wait().await?;

        let addr = self.state.config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let port = listener.local_addr()?.port();

        // URLs say `localhost`, which may resolve to ::1 first.
        let mut listeners = vec![listener];
        let v6 = SocketAddr::from((Ipv6Addr::LOCALHOST, port));
        match TcpListener::bind(v6).await {
            Ok(listener) => listeners.push(listener),
            Err(e) => tracing::debug!("Not listening on {}: {}", v6, e),
        }

        let app = create_router(self.state.clone());
        let mut shutdown = Vec::with_capacity(listeners.len());
        let mut serve_tasks = Vec::with_capacity(listeners.len());
        for listener in listeners {
            let (signal, stopped) = oneshot::channel::<()>();
            let app = app.clone();
            serve_tasks.push(tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = stopped.await;
                    })
                    .await
            }));
            shutdown.push(signal);
        }
        let purge_task = spawn_purge_task(self.state.clone());

        tracing::info!(
            "Preview server listening on localhost:{} ({} listener(s))",
            port,
            serve_tasks.len()
        );
        self.port.store(port, Ordering::SeqCst);
        *lifecycle = Lifecycle::Running(RunningServer {
            port,
            shutdown,
            serve_tasks,
            purge_task,
        });

        Ok(port)
    }

    /// Stop serving and dispose of everything the server created.
    ///
    /// Stops accepting connections, waits for open ones (up to a timeout),
    /// waits for extraction to have finished, deletes the extracted assets
    /// and forgets all registered documents. A configured asset root that
    /// already existed keeps its previous contents. Safe to call more than
    /// once.
    pub async fn stop(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Stopped => return Ok(()),
            Lifecycle::Running(running) => running.shutdown().await,
            Lifecycle::Idle => {}
        }
        self.port.store(0, Ordering::SeqCst);

        let revoked = self.state.registry.len();
        self.state.registry.clear();
        self.state.assets.remove().await?;
        tracing::info!(
            "Preview server disposed ({} document(s) revoked)",
            revoked
        );
        Ok(())
    }

    /// Register a local file and return its viewer URL
    pub async fn register_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let port = self.running_port()?;
        self.state.assets.wait().await?;

        let path = path.as_ref();
        let invalid = || ServerError::InvalidDocument(path.to_path_buf());
        let metadata = tokio::fs::metadata(path).await.map_err(|_| invalid())?;
        if !metadata.is_file() {
            return Err(invalid());
        }
        let absolute = tokio::fs::canonicalize(path).await.map_err(|_| invalid())?;

        tracing::debug!("Registering document {}", absolute.display());
        let token = self.state.registry.register(DocumentSource::File(absolute));
        Ok(self.viewer_url(port, &token))
    }

    /// Register an on-demand stream and return its viewer URL.
    ///
    /// `factory` is called once for every GET of the document and never
    /// for HEAD.
    pub async fn register_stream<F>(&self, factory: F) -> Result<String>
    where
        F: Fn() -> std::io::Result<DocumentStream> + Send + Sync + 'static,
    {
        let port = self.running_port()?;
        self.state.assets.wait().await?;

        let token = self.state.registry.register(DocumentSource::stream(factory));
        Ok(self.viewer_url(port, &token))
    }

    /// Forget a registered document. Returns whether it was known.
    pub fn revoke(&self, token: &str) -> bool {
        self.state.registry.revoke(token)
    }

    /// Bound port, while running
    pub fn port(&self) -> Option<u16> {
        match self.port.load(Ordering::SeqCst) {
            0 => None,
            port => Some(port),
        }
    }

    pub fn is_running(&self) -> bool {
        self.port().is_some()
    }

    /// Directory holding the extracted viewer assets
    pub fn asset_root(&self) -> &Path {
        self.state.assets.root()
    }

    /// Direct URL of a document, without the viewer page
    pub fn document_url(&self, token: &str) -> Result<String> {
        let port = self.running_port()?;
        Ok(format!("http://localhost:{}{}", port, document_path(token)))
    }

    /// Number of live registrations
    pub fn document_count(&self) -> usize {
        self.state.registry.len()
    }

    fn running_port(&self) -> Result<u16> {
        self.port().ok_or(ServerError::NotRunning)
    }

    fn viewer_url(&self, port: u16, token: &str) -> String {
        let path = document_path(token);
        let file = utf8_percent_encode(&path, QUERY_VALUE);
        format!(
            "http://localhost:{}{}?file={}",
            port, self.state.config.assets.viewer_page, file
        )
    }
}

impl Drop for PreviewServer {
    fn drop(&mut self) {
        match std::mem::replace(self.lifecycle.get_mut(), Lifecycle::Stopped) {
            Lifecycle::Stopped => return,
            Lifecycle::Running(running) => {
                running.purge_task.abort();
                for signal in running.shutdown {
                    let _ = signal.send(());
                }
            }
            Lifecycle::Idle => {}
        }
        tracing::debug!("Preview server dropped without stop(), cleaning up");
        self.state.registry.clear();
        self.state.assets.remove_now();
    }
}

// Background task: drop expired documents so abandoned registrations do not
// hold on to paths or stream factories.
fn spawn_purge_task(state: Arc<AppState>) -> JoinHandle<()> {
    let period = state.config.purge_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let removed = state.registry.purge_expired();
            if removed > 0 {
                tracing::info!("Purged {} expired document(s)", removed);
            }
        }
    })
}
