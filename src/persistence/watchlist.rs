//! The watchlist: repositories this service is allowed to sync and build.
//!
//! # File Format
//!
//! A JSON array of objects, written with 4-space indentation:
//!
//! ```text
//! [
//!     {
//!         "name": "demo",
//!         "directory": "demo-dir",
//!         "secret": "s3cret",
//!         "id": 1296269
//!     }
//! ]
//! ```
//!
//! `secret` and `id` are optional. Keys this module does not know are kept
//! and written back unchanged.
//!
//! # Concurrency
//!
//! Every request reads the file fresh. Saves are atomic (temp file, fsync,
//! rename, fsync directory), so readers see either the old or new document.
//! The only writer, [`WatchlistStore::learn_id`], reloads and rewrites under
//! an exclusive [`WatchlistLock`] so concurrent id-learning cannot lose
//! updates.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::fsync::{fsync_dir, fsync_file};
use super::lock::WatchlistLock;
use crate::types::{RemoteRepoId, RepoName};

/// Errors that can occur while reading or writing the watchlist.
#[derive(Debug, Error)]
pub enum WatchlistError {
    /// IO error (including a missing file).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The document is not a valid watchlist.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two records share a name.
    #[error("duplicate watchlist entry: {0}")]
    DuplicateName(RepoName),

    /// A record's directory would escape the repos root.
    #[error("invalid directory for {name}: {directory:?}")]
    InvalidDirectory { name: RepoName, directory: String },
}

/// Result type for watchlist operations.
pub type Result<T> = std::result::Result<T, WatchlistError>;

/// One watched repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRepo {
    /// Repository name on the remote; unique within the watchlist.
    pub name: RepoName,

    /// Clone location, relative to the repos root.
    pub directory: String,

    /// Shared webhook secret. Falls back to the configured default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Remote id, learned on the first verified push and never overwritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteRepoId>,

    /// Operator-supplied keys, preserved across rewrites.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TrackedRepo {
    pub fn new(name: impl Into<RepoName>, directory: impl Into<String>) -> Self {
        TrackedRepo {
            name: name.into(),
            directory: directory.into(),
            secret: None,
            id: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Resolves the clone path under `repos_dir`.
    pub fn local_path(&self, repos_dir: &Path) -> PathBuf {
        repos_dir.join(&self.directory)
    }
}

/// Ordered collection of tracked repositories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Watchlist {
    repos: Vec<TrackedRepo>,
}

impl Watchlist {
    /// Builds a watchlist, rejecting duplicate names and unsafe directories.
    pub fn new(repos: Vec<TrackedRepo>) -> Result<Self> {
        let watchlist = Watchlist { repos };
        watchlist.validate()?;
        Ok(watchlist)
    }

    pub fn get(&self, name: &RepoName) -> Option<&TrackedRepo> {
        self.repos.iter().find(|r| &r.name == name)
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Records the remote id for `name` if it has none yet.
    ///
    /// Returns `true` if the watchlist changed. An existing id is never
    /// replaced, and an unknown name is a no-op.
    pub fn upsert_id(&mut self, name: &RepoName, id: RemoteRepoId) -> bool {
        match self.repos.iter_mut().find(|r| &r.name == name) {
            Some(repo) if repo.id.is_none() => {
                repo.id = Some(id);
                true
            }
            _ => false,
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for repo in &self.repos {
            if !seen.insert(&repo.name) {
                return Err(WatchlistError::DuplicateName(repo.name.clone()));
            }
            if !is_safe_directory(&repo.directory) {
                return Err(WatchlistError::InvalidDirectory {
                    name: repo.name.clone(),
                    directory: repo.directory.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A clone directory must be a non-empty relative path without `..`.
fn is_safe_directory(directory: &str) -> bool {
    let path = Path::new(directory);
    !directory.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().any(|c| matches!(c, Component::Normal(_)))
}

/// Reads and writes the watchlist file.
#[derive(Debug, Clone)]
pub struct WatchlistStore {
    path: PathBuf,
}

impl WatchlistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        WatchlistStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and validates the watchlist.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing or unreadable, is not a JSON array of
    /// records, contains duplicate names, or names an unsafe directory.
    pub fn load(&self) -> Result<Watchlist> {
        let bytes = std::fs::read(&self.path)?;
        let repos: Vec<TrackedRepo> = serde_json::from_slice(&bytes)?;
        Watchlist::new(repos)
    }

    /// Overwrites the file with `watchlist`, atomically.
    ///
    /// The output is deterministic, so saving an unchanged watchlist
    /// reproduces the previous bytes exactly.
    pub fn save(&self, watchlist: &Watchlist) -> Result<()> {
        let bytes = serialize(watchlist)?;
        let tmp_path = self.temp_path();

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(&bytes)?;
            fsync_file(&file)?;
        }

        std::fs::rename(&tmp_path, &self.path)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fsync_dir(parent)?;
        }

        Ok(())
    }

    /// Persists a newly learned remote id for `name`.
    ///
    /// Holds the exclusive lock across reload, update and save, and only
    /// writes when the id was actually missing. Returns whether the file was
    /// rewritten.
    pub fn learn_id(&self, name: &RepoName, id: RemoteRepoId) -> Result<bool> {
        let _lock = WatchlistLock::acquire(&self.path)?;

        let mut watchlist = self.load()?;
        if !watchlist.upsert_id(name, id) {
            debug!(repo = %name, "Remote id already known, watchlist unchanged");
            return Ok(false);
        }

        self.save(&watchlist)?;
        info!(repo = %name, id = %id, "Learned remote repository id");
        Ok(true)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn serialize(watchlist: &Watchlist) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    watchlist.serialize(&mut serializer)?;
    bytes.push(b'\n');
    Ok(bytes)
}
