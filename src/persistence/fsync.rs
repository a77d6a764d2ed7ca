//! fsync helpers used by the atomic watchlist rewrite.
//!
//! Renaming the temp file over the watchlist changes a directory entry, so
//! the parent directory has to be synced as well as the file itself before
//! the rewrite can be considered durable.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Syncs a file's contents and metadata to disk.
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Syncs a directory so that a rename inside it survives a crash.
///
/// # Errors
///
/// Returns an error if the path doesn't exist or the sync fails.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(dir_path)?;
    dir.sync_all()
}
