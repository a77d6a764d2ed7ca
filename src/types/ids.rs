//! Newtype wrappers for repository identifiers.
//!
//! A repository is addressed two ways: by the name operators write into the
//! watchlist, and by the numeric id the remote assigns. Keeping them as
//! distinct types stops one being passed where the other is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A repository name as it appears on the remote and in the watchlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoName(pub String);

impl RepoName {
    pub fn new(s: impl Into<String>) -> Self {
        RepoName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        RepoName(s.to_string())
    }
}

impl From<String> for RepoName {
    fn from(s: String) -> Self {
        RepoName(s)
    }
}

/// The numeric id the remote assigns to a repository.
///
/// Learned from the first verified push and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteRepoId(pub u64);

impl fmt::Display for RemoteRepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RemoteRepoId {
    fn from(n: u64) -> Self {
        RemoteRepoId(n)
    }
}
