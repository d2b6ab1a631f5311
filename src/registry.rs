//! Document registry
//!
//! Maps opaque tokens to document sources. Entries use a sliding
//! expiration: every successful lookup restarts the entry's idle timer,
//! and an entry idle for longer than the TTL behaves as if it never
//! existed.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::io::AsyncRead;
use uuid::Uuid;

/// Readable byte stream produced by a [`StreamFactory`]
pub type DocumentStream = Box<dyn AsyncRead + Send + Unpin>;

/// Produces a fresh document stream each time it is called
pub type StreamFactory = Arc<dyn Fn() -> std::io::Result<DocumentStream> + Send + Sync>;

/// Where the bytes of a registered document come from
#[derive(Clone)]
pub enum DocumentSource {
    /// A local file, read on every request
    File(PathBuf),
    /// An on-demand stream, opened once per GET request
    Stream(StreamFactory),
}

impl DocumentSource {
    /// Wrap a closure as a stream source
    pub fn stream<F>(factory: F) -> Self
    where
        F: Fn() -> std::io::Result<DocumentStream> + Send + Sync + 'static,
    {
        DocumentSource::Stream(Arc::new(factory))
    }
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::File(path) => f.debug_tuple("File").field(path).finish(),
            DocumentSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Registry entry with access metadata
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub source: DocumentSource,
    pub registered_at: Instant,
    pub last_accessed: Instant,
}

impl RegistryEntry {
    fn new(source: DocumentSource, now: Instant) -> Self {
        Self {
            source,
            registered_at: now,
            last_accessed: now,
        }
    }

    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_accessed) >= ttl
    }
}

/// Token -> document map shared by all request handlers
pub struct DocumentRegistry {
    entries: DashMap<String, RegistryEntry>,
    ttl: Duration,
}

impl DocumentRegistry {
    /// Create an empty registry with the given idle lifetime
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Sliding lifetime of the entries
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Register a source and return its freshly minted token
    pub fn register(&self, source: DocumentSource) -> String {
        self.register_at(source, Instant::now())
    }

    pub(crate) fn register_at(&self, source: DocumentSource, now: Instant) -> String {
        let token = Uuid::new_v4().simple().to_string();
        tracing::debug!("Registered document {} -> {:?}", token, source);
        self.entries
            .insert(token.clone(), RegistryEntry::new(source, now));
        token
    }

    /// Look up a token, refreshing its lifetime on a hit
    pub fn lookup(&self, token: &str) -> Option<DocumentSource> {
        self.lookup_at(token, Instant::now())
    }

    pub(crate) fn lookup_at(&self, token: &str, now: Instant) -> Option<DocumentSource> {
        let mut entry = self.entries.get_mut(token)?;
        if entry.is_expired(now, self.ttl) {
            drop(entry);
            // Re-check under the removal lock so a concurrent hit is not lost.
            self.entries
                .remove_if(token, |_, e| e.is_expired(now, self.ttl));
            tracing::debug!("Document {} expired", token);
            return None;
        }
        entry.last_accessed = now;
        Some(entry.source.clone())
    }

    /// Drop a registration before it expires
    pub fn revoke(&self, token: &str) -> bool {
        self.entries.remove(token).is_some()
    }

    /// Remove expired entries
    /// Returns number of removed entries
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub(crate) fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now, self.ttl));
        before.saturating_sub(self.entries.len())
    }

    /// Remove every registration
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included until purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
