//! Push handling, from classified event to status line.
//!
//! [`Pipeline::handle_push`] runs the decision sequence and stops at the
//! first terminal condition:
//!
//! 1. Skip marker in the head commit message
//! 2. Repository not on the watchlist
//! 3. Signature or sender check fails
//! 4. Learn the remote id if the record lacks one
//! 5. Sync the local clone (under the per-repository lock)
//! 6. Build (still under the lock)
//!
//! Each stop is a [`PushOutcome`] variant; storage and process-spawn
//! failures are [`PipelineError`]s.

pub mod locks;

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::build::{BuildReport, BuildRunner};
use crate::config::Config;
use crate::git::{GitError, RepositoryFactory, sync};
use crate::persistence::{WatchlistError, WatchlistStore};
use crate::webhooks::{Event, PushEvent, RequestAuth, verify};

pub use locks::RepoLocks;

/// Errors that abort a request.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The watchlist could not be read or written.
    #[error("watchlist error: {0}")]
    Watchlist(#[from] WatchlistError),

    /// Git could not be run or the clone directory could not be created.
    #[error("git error: {0}")]
    Git(#[from] GitError),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// How a push request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The head commit asked not to be built.
    SkipRequested,
    /// The repository is not watched. Nothing was touched.
    NotOnWatchlist,
    /// The request could not be authenticated. Nothing was touched.
    UnknownRequester,
    /// Synchronization failed with this exit code; no build ran.
    CloneFailed { code: i32 },
    /// The build ran. Its own result is in the report, not the status line.
    BuildFinished { report: BuildReport },
}

impl PushOutcome {
    /// The single line shown to the webhook sender.
    pub fn status_line(&self) -> String {
        match self {
            PushOutcome::SkipRequested => "Commit message demands skip".to_string(),
            PushOutcome::NotOnWatchlist => "Repository not on watchlist".to_string(),
            PushOutcome::UnknownRequester => "Unknown requester".to_string(),
            PushOutcome::CloneFailed { code } => format!("Clone failed with code {code}"),
            PushOutcome::BuildFinished { .. } => "Build finished".to_string(),
        }
    }
}

/// Returns the first marker contained in `message`, if any.
pub fn find_skip_marker<'a>(message: &str, markers: &'a [String]) -> Option<&'a str> {
    markers
        .iter()
        .map(String::as_str)
        .find(|marker| message.contains(marker))
}

/// Everything a request needs, shared between requests.
///
/// Holds only static configuration and the lock table; the watchlist is
/// read from disk on every push.
pub struct Pipeline {
    config: Config,
    store: WatchlistStore,
    repositories: Box<dyn RepositoryFactory>,
    builder: Box<dyn BuildRunner>,
    locks: RepoLocks,
}

impl Pipeline {
    pub fn new(
        config: Config,
        repositories: Box<dyn RepositoryFactory>,
        builder: Box<dyn BuildRunner>,
    ) -> Self {
        let store = WatchlistStore::new(config.watchlist_path());
        Pipeline {
            config,
            store,
            repositories,
            builder,
            locks: RepoLocks::new(),
        }
    }

    /// Dispatches a classified event and returns the status lines to show.
    ///
    /// Pushes produce exactly one line; pings and unknown events none.
    pub fn handle(&self, event: &Event, raw: &[u8], auth: &RequestAuth) -> Result<Vec<String>> {
        match event {
            Event::Push(push) => {
                let outcome = self.handle_push(push, raw, auth)?;
                Ok(vec![outcome.status_line()])
            }
            Event::Ping => {
                self.handle_ping();
                Ok(Vec::new())
            }
            Event::Unknown(kind) => {
                debug!(event_type = %kind, "Ignoring unhandled event type");
                Ok(Vec::new())
            }
        }
    }

    /// Pings are acknowledged without any action.
    pub fn handle_ping(&self) {
        debug!("Received ping");
    }

    /// Runs the push decision sequence.
    pub fn handle_push(
        &self,
        push: &PushEvent,
        raw: &[u8],
        auth: &RequestAuth,
    ) -> Result<PushOutcome> {
        let name = push.repo_name();

        if let Some(marker) = find_skip_marker(push.head_message(), &self.config.skip_markers) {
            info!(repo = %name, marker, "Commit message demands skip");
            return Ok(PushOutcome::SkipRequested);
        }

        let watchlist = self.store.load()?;
        let Some(tracked) = watchlist.get(name) else {
            info!(repo = %name, "Repository not on watchlist");
            return Ok(PushOutcome::NotOnWatchlist);
        };

        if !verify(
            tracked,
            self.config.default_secret.as_deref(),
            raw,
            auth,
            &self.config.user_agent_prefix,
        ) {
            info!(repo = %name, "Rejected push from unknown requester");
            return Ok(PushOutcome::UnknownRequester);
        }

        match tracked.id {
            None => {
                self.store.learn_id(name, push.repo_id())?;
            }
            Some(known) if known != push.repo_id() => {
                warn!(
                    repo = %name,
                    stored = %known,
                    received = %push.repo_id(),
                    "Push carries a different remote id; keeping the stored one"
                );
            }
            Some(_) => {}
        }

        let local_path = tracked.local_path(&self.config.repos_dir());

        let lock = self.locks.lock_for(name);
        let _guard = locks::acquire(&lock);

        let repo = self.repositories.open(name);
        let code = sync(repo.as_ref(), &local_path)?;
        if code != 0 {
            warn!(repo = %name, code, "Synchronization failed");
            return Ok(PushOutcome::CloneFailed { code });
        }

        let report = self.run_build(&local_path);
        Ok(PushOutcome::BuildFinished { report })
    }

    fn run_build(&self, local_path: &Path) -> BuildReport {
        let report = self.builder.build_and_report(local_path);
        if report.success {
            info!(
                path = %report.path.display(),
                duration_ms = (report.finished_at - report.started_at).num_milliseconds(),
                "Build succeeded"
            );
        } else {
            warn!(
                path = %report.path.display(),
                exit_code = ?report.exit_code,
                output = %report.output,
                "Build failed"
            );
        }
        debug!(report = ?report, "Build report");
        report
    }
}
