//! Asset extraction and the completion barrier

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::watch;
use zip::ZipArchive;

use crate::error::{AssetError, ServerError};

/// Packaged viewer application
#[derive(Debug, Clone)]
pub enum AssetBundle {
    /// Zip archive on disk
    Archive(PathBuf),
    /// Zip archive held in memory, e.g. from `include_bytes!`
    Memory(Bytes),
}

/// Unpack `bundle` under `root`.
/// Returns the number of files written.
pub fn extract_bundle(bundle: &AssetBundle, root: &Path) -> Result<usize, AssetError> {
    fs::create_dir_all(root)?;

    match bundle {
        AssetBundle::Archive(path) => {
            let file = fs::File::open(path).map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => AssetError::MissingArchive(path.clone()),
                _ => AssetError::Io(e),
            })?;
            extract_archive(io::BufReader::new(file), root)
        }
        AssetBundle::Memory(data) => extract_archive(Cursor::new(data.clone()), root),
    }
}

fn extract_archive<R: Read + Seek>(reader: R, root: &Path) -> Result<usize, AssetError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("Skipping asset entry outside of root: {}", entry.name());
            continue;
        };
        let target = root.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = fs::File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    Ok(written)
}

type Outcome = Result<(), Arc<AssetError>>;

/// What removal is allowed to delete
#[derive(Debug)]
enum OwnedTree {
    /// The root did not exist before extraction
    Root,
    /// The root was already there; only entries not in this set are ours
    NewEntries(HashSet<OsString>),
}

/// Runs the one-time extraction and lets callers wait for it
pub struct AssetExtractor {
    root: PathBuf,
    owned: Arc<Mutex<Option<OwnedTree>>>,
    outcome: watch::Receiver<Option<Outcome>>,
}

impl AssetExtractor {
    /// Start unpacking `bundle` into `root` on the blocking pool.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(bundle: AssetBundle, root: PathBuf) -> Arc<Self> {
        let target = root.clone();
        let owned = Arc::new(Mutex::new(None));
        let claimed = owned.clone();
        let task = tokio::task::spawn_blocking(move || {
            let started = std::time::Instant::now();
            *claimed.lock() = Some(claim_root(&target)?);
            let count = extract_bundle(&bundle, &target)?;
            tracing::info!(
                "Extracted {} viewer assets to {} in {:?}",
                count,
                target.display(),
                started.elapsed()
            );
            Ok::<_, AssetError>(count)
        });

        // The outcome is published by its own task, so a waiter that gives
        // up early cannot lose it for the others.
        let (publish, outcome) = watch::channel(None);
        tokio::spawn(async move {
            let result = match task.await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(AssetError::TaskFailed(e.to_string())),
            };
            if let Err(e) = &result {
                tracing::error!("Viewer asset extraction failed: {}", e);
            }
            let _ = publish.send(Some(result.map_err(Arc::new)));
        });

        Arc::new(Self {
            root,
            owned,
            outcome,
        })
    }

    /// Root of the extracted tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the barrier has been passed (successfully or not)
    pub fn is_finished(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// Wait until extraction has finished.
    ///
    /// Every caller observes the same outcome; an extraction failure is
    /// returned to all of them. Dropping a pending `wait()` has no effect
    /// on other waiters.
    pub async fn wait(&self) -> Result<(), ServerError> {
        let mut outcome = self.outcome.clone();
        let published = outcome
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|value| (*value).clone());

        match published {
            Some(result) => result.map_err(ServerError::from),
            None => Err(ServerError::from(Arc::new(AssetError::TaskFailed(
                "extraction task ended without a result".to_string(),
            )))),
        }
    }

    /// Wait for extraction, then delete what it created.
    ///
    /// A root that existed beforehand is kept along with every entry it
    /// already had.
    pub async fn remove(&self) -> Result<(), ServerError> {
        // A failed extraction may still have left partial output behind.
        let _ = self.wait().await;
        self.remove_owned()?;
        Ok(())
    }

    /// Same as [`remove`](Self::remove) without waiting, for use from `Drop`
    pub(crate) fn remove_now(&self) {
        if let Err(e) = self.remove_owned() {
            tracing::warn!("Failed to remove {}: {}", self.root.display(), e);
        }
    }

    fn remove_owned(&self) -> io::Result<()> {
        let owned = self.owned.lock();
        match owned.as_ref() {
            None => Ok(()),
            Some(OwnedTree::Root) => {
                remove_path(&self.root)?;
                tracing::debug!("Removed asset tree {}", self.root.display());
                Ok(())
            }
            Some(OwnedTree::NewEntries(existing)) => {
                let entries = match fs::read_dir(&self.root) {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                    Err(e) => return Err(e),
                };
                for entry in entries {
                    let entry = entry?;
                    if !existing.contains(&entry.file_name()) {
                        remove_path(&entry.path())?;
                    }
                }
                tracing::debug!("Removed extracted assets under {}", self.root.display());
                Ok(())
            }
        }
    }
}

// Records what is already at `root` before anything is written there.
fn claim_root(root: &Path) -> io::Result<OwnedTree> {
    match fs::read_dir(root) {
        Ok(entries) => {
            let existing = entries
                .map(|entry| entry.map(|e| e.file_name()))
                .collect::<io::Result<HashSet<_>>>()?;
            Ok(OwnedTree::NewEntries(existing))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(root)?;
            Ok(OwnedTree::Root)
        }
        Err(e) => Err(e),
    }
}

fn remove_path(path: &Path) -> io::Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
