//! Shared test doubles and fixtures.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use proptest::prelude::*;
use serde_json::json;

use crate::build::{BuildReport, BuildRunner};
use crate::git::{GitResult, RepositoryFactory, RepositoryHandle};
use crate::types::RepoName;
use crate::webhooks::{RequestAuth, compute_signature, format_signature_header};

/// A git operation recorded by [`ScriptedRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    Clone(PathBuf),
    Pull(PathBuf),
}

#[derive(Debug, Default)]
struct Script {
    clone_codes: VecDeque<i32>,
    pull_codes: VecDeque<i32>,
    calls: Vec<GitCall>,
    opened: Vec<RepoName>,
}

/// Repository handle that replays scripted exit codes and records calls.
///
/// Clones share the same script, so a copy handed to a pipeline can be
/// inspected afterwards. Running out of scripted codes panics.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRepository {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRepository {
    pub fn new() -> Self {
        ScriptedRepository::default()
    }

    pub fn clone_codes(self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.script.lock().unwrap().clone_codes.extend(codes);
        self
    }

    pub fn pull_codes(self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.script.lock().unwrap().pull_codes.extend(codes);
        self
    }

    pub fn calls(&self) -> Vec<GitCall> {
        self.script.lock().unwrap().calls.clone()
    }

    /// Names the factory was asked to open.
    pub fn opened(&self) -> Vec<RepoName> {
        self.script.lock().unwrap().opened.clone()
    }
}

impl RepositoryHandle for ScriptedRepository {
    fn clone_to(&self, path: &Path) -> GitResult<i32> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(GitCall::Clone(path.to_path_buf()));
        Ok(script
            .clone_codes
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected clone into {}", path.display())))
    }

    fn pull(&self, path: &Path) -> GitResult<i32> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(GitCall::Pull(path.to_path_buf()));
        Ok(script
            .pull_codes
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected pull in {}", path.display())))
    }
}

impl RepositoryFactory for ScriptedRepository {
    fn open(&self, name: &RepoName) -> Box<dyn RepositoryHandle> {
        self.script.lock().unwrap().opened.push(name.clone());
        Box::new(self.clone())
    }
}

/// Build runner that records the paths it was asked to build.
#[derive(Debug, Clone)]
pub struct RecordingBuild {
    builds: Arc<Mutex<Vec<PathBuf>>>,
    success: bool,
}

impl RecordingBuild {
    pub fn succeeding() -> Self {
        RecordingBuild {
            builds: Arc::default(),
            success: true,
        }
    }

    pub fn failing() -> Self {
        RecordingBuild {
            builds: Arc::default(),
            success: false,
        }
    }

    pub fn builds(&self) -> Vec<PathBuf> {
        self.builds.lock().unwrap().clone()
    }
}

impl BuildRunner for RecordingBuild {
    fn build_and_report(&self, path: &Path) -> BuildReport {
        self.builds.lock().unwrap().push(path.to_path_buf());
        let now = Utc::now();
        BuildReport {
            path: path.to_path_buf(),
            success: self.success,
            exit_code: Some(if self.success { 0 } else { 2 }),
            started_at: now,
            finished_at: now,
            output: String::new(),
        }
    }
}

/// Build runner that holds each build open for a while and records the
/// highest number of builds that were running at once.
#[derive(Debug, Clone)]
pub struct OverlapCountingBuild {
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    hold: Duration,
}

impl OverlapCountingBuild {
    pub fn holding_for(hold: Duration) -> Self {
        OverlapCountingBuild {
            running: Arc::default(),
            peak: Arc::default(),
            hold,
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl BuildRunner for OverlapCountingBuild {
    fn build_and_report(&self, path: &Path) -> BuildReport {
        let started_at = Utc::now();
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_running, Ordering::SeqCst);
        std::thread::sleep(self.hold);
        self.running.fetch_sub(1, Ordering::SeqCst);
        BuildReport {
            path: path.to_path_buf(),
            success: true,
            exit_code: Some(0),
            started_at,
            finished_at: Utc::now(),
            output: String::new(),
        }
    }
}

/// A push payload as GitHub would send it, reduced to the fields that matter.
pub fn push_payload(name: &str, id: u64, message: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "ref": "refs/heads/main",
        "repository": {
            "id": id,
            "name": name,
            "full_name": format!("octocat/{name}")
        },
        "head_commit": {
            "id": "6dcb09b5b57875f334f61aebed695e2e4193db5e",
            "message": message
        }
    }))
    .unwrap()
}

/// Headers of a genuine delivery signed with `secret`.
pub fn signed_auth(body: &[u8], secret: &str) -> RequestAuth {
    RequestAuth::new(
        Some(format_signature_header(&compute_signature(
            body,
            secret.as_bytes(),
        ))),
        Some("GitHub-Hookshot/044aadd".to_string()),
    )
}

/// Writes a watchlist file from a JSON value.
pub fn write_watchlist(path: &Path, value: serde_json::Value) {
    std::fs::write(path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}

pub fn arb_commit_message() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,:#()\\-\n]{0,80}".prop_map(String::from)
}
