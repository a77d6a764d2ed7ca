//! Typed webhook events.
//!
//! Only push events carry data the pipeline acts on. Pings are acknowledged
//! and everything else is kept as an opaque type name so it can be logged.

use serde::Deserialize;

use crate::types::{RemoteRepoId, RepoName};

/// A classified inbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Commits were pushed to a repository.
    Push(PushEvent),

    /// The sender is checking that the endpoint is reachable.
    Ping,

    /// Any other event type. Ignored.
    Unknown(String),
}

impl Event {
    /// Short name for logging.
    pub fn kind(&self) -> &str {
        match self {
            Event::Push(_) => "push",
            Event::Ping => "ping",
            Event::Unknown(other) => other,
        }
    }
}

/// The fields of a push payload the pipeline relies on.
///
/// All fields are required. A push without a repository or head commit is
/// rejected at parse time instead of failing later in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushEvent {
    pub repository: PushRepository,
    pub head_commit: HeadCommit,
}

impl PushEvent {
    pub fn repo_name(&self) -> &RepoName {
        &self.repository.name
    }

    pub fn repo_id(&self) -> RemoteRepoId {
        self.repository.id
    }

    pub fn head_message(&self) -> &str {
        &self.head_commit.message
    }
}

/// Repository section of a push payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushRepository {
    pub id: RemoteRepoId,
    pub name: RepoName,
}

/// The newest commit of the push.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeadCommit {
    pub message: String,
}
