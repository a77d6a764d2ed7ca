//! Pull-or-clone synchronization of a local clone.
//!
//! A missing directory is created and cloned into. An existing one is pulled,
//! and if the pull fails for any reason (diverged history, corrupt or empty
//! directory) the clone is attempted into the same path. Nothing is cleaned
//! up after a failure, so the next request goes through the same recovery.

use std::path::Path;

use tracing::{debug, info, warn};

use super::{GitResult, RepositoryHandle};

/// Which operation the synchronizer settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No local directory yet.
    NeedsClone,
    /// A local directory exists and should be updated in place.
    NeedsPull,
}

impl SyncState {
    /// Determines the starting state from the filesystem.
    pub fn for_path(local_path: &Path) -> Self {
        if local_path.exists() {
            SyncState::NeedsPull
        } else {
            SyncState::NeedsClone
        }
    }
}

/// Brings the clone at `local_path` up to date and returns the exit code of
/// the last git operation run (0 on success).
///
/// # Errors
///
/// Only when the directory cannot be created or git cannot be started; a
/// git failure is reported through the returned code.
pub fn sync(repo: &dyn RepositoryHandle, local_path: &Path) -> GitResult<i32> {
    match SyncState::for_path(local_path) {
        SyncState::NeedsClone => {
            std::fs::create_dir_all(local_path)?;
            debug!(path = %local_path.display(), "No local clone, cloning");
            let code = repo.clone_to(local_path)?;
            info!(path = %local_path.display(), code, "Clone finished");
            Ok(code)
        }
        SyncState::NeedsPull => {
            let code = repo.pull(local_path)?;
            if code == 0 {
                debug!(path = %local_path.display(), "Pull succeeded");
                return Ok(0);
            }

            warn!(
                path = %local_path.display(),
                code,
                "Pull failed, falling back to clone"
            );
            let code = repo.clone_to(local_path)?;
            info!(path = %local_path.display(), code, "Fallback clone finished");
            Ok(code)
        }
    }
}
