//! Advisory lock serializing watchlist rewrites across processes.
//!
//! The watchlist itself is replaced by rename on every save, so the lock is
//! taken on a sibling `<file>.lock` whose inode stays stable.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::trace;

/// Holds an exclusive lock until dropped.
#[derive(Debug)]
pub struct WatchlistLock {
    file: File,
    path: PathBuf,
}

impl WatchlistLock {
    /// Blocks until the exclusive lock for `watchlist_path` is acquired.
    pub fn acquire(watchlist_path: &Path) -> io::Result<Self> {
        let path = lock_path(watchlist_path);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        trace!(path = %path.display(), "Acquiring watchlist lock");
        file.lock_exclusive()?;
        trace!(path = %path.display(), "Watchlist lock acquired");

        Ok(WatchlistLock { file, path })
    }
}

impl Drop for WatchlistLock {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock as well; unlocking
        // explicitly just makes the release point deterministic.
        let _ = FileExt::unlock(&self.file);
        trace!(path = %self.path.display(), "Watchlist lock released");
    }
}

/// Returns the lock file path for a watchlist file.
pub fn lock_path(watchlist_path: &Path) -> PathBuf {
    let mut name = watchlist_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    watchlist_path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_path_appends_suffix() {
        assert_eq!(
            lock_path(Path::new("/srv/hooks/watch_conf.json")),
            PathBuf::from("/srv/hooks/watch_conf.json.lock")
        );
    }

    #[test]
    fn acquire_creates_lock_file() {
        let dir = tempdir().unwrap();
        let watchlist = dir.path().join("watch_conf.json");

        let _lock = WatchlistLock::acquire(&watchlist).unwrap();
        assert!(lock_path(&watchlist).exists());
    }

    #[test]
    fn lock_can_be_reacquired_after_drop() {
        let dir = tempdir().unwrap();
        let watchlist = dir.path().join("watch_conf.json");

        drop(WatchlistLock::acquire(&watchlist).unwrap());
        let _again = WatchlistLock::acquire(&watchlist).unwrap();
        let other = File::open(lock_path(&watchlist)).unwrap();
        assert!(other.try_lock_exclusive().is_err());
    }

    #[test]
    fn second_handle_cannot_lock_while_held() {
        let dir = tempdir().unwrap();
        let watchlist = dir.path().join("watch_conf.json");

        let _held = WatchlistLock::acquire(&watchlist).unwrap();
        let other = File::open(lock_path(&watchlist)).unwrap();
        assert!(other.try_lock_exclusive().is_err());
    }
}
