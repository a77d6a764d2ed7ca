//! Local git operations that keep a clone in step with its remote.
//!
//! The pipeline only needs two operations, clone and pull, each reported as
//! the exit code of a finished `git` process. They sit behind the
//! [`RepositoryHandle`] trait so the synchronizer can be driven by scripted
//! handles in tests.

pub mod sync;

use std::path::Path;
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::debug;

use crate::types::RepoName;

pub use sync::{SyncState, sync};

/// Errors from git operations.
///
/// A git process that runs and exits nonzero is not an error here; it is
/// reported through its exit code. These cover failures to run it at all.
#[derive(Debug, Error)]
pub enum GitError {
    /// IO error (spawning git, creating directories).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// A remote repository paired with operations on a local clone of it.
pub trait RepositoryHandle {
    /// Clones the remote into `path`, which must exist, and waits for it.
    fn clone_to(&self, path: &Path) -> GitResult<i32>;

    /// Pulls the remote into the clone at `path` and waits for it.
    fn pull(&self, path: &Path) -> GitResult<i32>;
}

/// Builds a [`RepositoryHandle`] for a repository name.
pub trait RepositoryFactory: Send + Sync {
    fn open(&self, name: &RepoName) -> Box<dyn RepositoryHandle>;
}

/// Create a git Command that never blocks on a credential prompt.
pub(crate) fn git_command(workdir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(workdir);
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

/// Maps a finished process to a shell-style exit code.
///
/// Processes killed by a signal report `128 + signal`; `-1` if the platform
/// offers neither.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

/// A repository reached through the `git` binary.
#[derive(Debug, Clone)]
pub struct GitRepository {
    name: RepoName,
    remote_url: String,
}

impl GitRepository {
    pub fn new(name: RepoName, remote_url: impl Into<String>) -> Self {
        GitRepository {
            name,
            remote_url: remote_url.into(),
        }
    }

    fn run(&self, path: &Path, args: &[&str]) -> GitResult<i32> {
        debug!(
            repo = %self.name,
            path = %path.display(),
            command = %format!("git {}", args.join(" ")),
            "Running git"
        );
        let status = git_command(path).args(args).status()?;
        Ok(exit_code(status))
    }
}

impl RepositoryHandle for GitRepository {
    fn clone_to(&self, path: &Path) -> GitResult<i32> {
        self.run(path, &["clone", "--quiet", &self.remote_url, "."])
    }

    fn pull(&self, path: &Path) -> GitResult<i32> {
        self.run(path, &["pull", "--quiet", "--ff-only"])
    }
}

/// Opens [`GitRepository`] handles by substituting the name into a URL
/// template such as `https://github.com/example-org/{name}.git`.
#[derive(Debug, Clone)]
pub struct GitRepositoryFactory {
    remote_template: String,
}

impl GitRepositoryFactory {
    pub fn new(remote_template: impl Into<String>) -> Self {
        GitRepositoryFactory {
            remote_template: remote_template.into(),
        }
    }

    pub fn remote_url(&self, name: &RepoName) -> String {
        self.remote_template.replace("{name}", name.as_str())
    }
}

impl RepositoryFactory for GitRepositoryFactory {
    fn open(&self, name: &RepoName) -> Box<dyn RepositoryHandle> {
        Box::new(GitRepository::new(name.clone(), self.remote_url(name)))
    }
}
