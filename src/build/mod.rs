//! The build step run after a successful sync.
//!
//! What a build does is up to the operator: [`CommandBuild`] runs a
//! configured command inside the fresh clone. The pipeline only logs the
//! resulting [`BuildReport`]; it never reaches the webhook response.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::git::exit_code;

/// Maximum number of output bytes kept in a report.
///
/// Build output is streamed through a buffer of this size, so a noisy build
/// never holds more than this much per pipe in memory.
pub const MAX_REPORT_OUTPUT: usize = 4096;

/// Outcome of one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub path: PathBuf,
    pub success: bool,
    /// `None` if the build could not be started or waited on.
    pub exit_code: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Tail of stdout followed by stderr.
    pub output: String,
}

/// Builds a synced clone and reports on it.
pub trait BuildRunner: Send + Sync {
    /// Runs the build for the clone at `path`.
    ///
    /// Never fails: problems, including failing to start, are described by
    /// the report.
    fn build_and_report(&self, path: &Path) -> BuildReport;
}

/// Runs an external command with the clone as working directory.
#[derive(Debug, Clone)]
pub struct CommandBuild {
    program: String,
    args: Vec<String>,
}

impl CommandBuild {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        CommandBuild {
            program: program.into(),
            args,
        }
    }

    /// Splits a configured `[program, args...]` list; `None` if empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(CommandBuild::new(program.clone(), args.to_vec()))
    }

    /// Waits for `child` while draining both pipes, keeping only their tails.
    fn collect(mut child: Child) -> io::Result<(ExitStatus, Vec<u8>)> {
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (stdout, stderr) = std::thread::scope(|scope| {
            let stdout = scope.spawn(move || read_tail(stdout, MAX_REPORT_OUTPUT));
            let stderr = read_tail(stderr, MAX_REPORT_OUTPUT);
            let stdout = stdout
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdout reader panicked")));
            (stdout, stderr)
        });
        let status = child.wait()?;

        let mut combined = TailBuffer::new(MAX_REPORT_OUTPUT);
        combined.push(&stdout?);
        combined.push(&stderr?);
        Ok((status, combined.into_bytes()))
    }
}

impl BuildRunner for CommandBuild {
    fn build_and_report(&self, path: &Path) -> BuildReport {
        let started_at = Utc::now();
        debug!(
            path = %path.display(),
            program = %self.program,
            "Starting build"
        );

        let spawned = Command::new(&self.program)
            .args(&self.args)
            .current_dir(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let (exit_code, success, output) = match spawned.and_then(CommandBuild::collect) {
            Ok((status, combined)) => (
                Some(exit_code(status)),
                status.success(),
                String::from_utf8_lossy(&combined).into_owned(),
            ),
            Err(e) => (None, false, format!("failed to run {}: {}", self.program, e)),
        };

        BuildReport {
            path: path.to_path_buf(),
            success,
            exit_code,
            started_at,
            finished_at: Utc::now(),
            output,
        }
    }
}

/// Byte sink that keeps only the last `capacity` bytes pushed into it.
#[derive(Debug)]
struct TailBuffer {
    bytes: VecDeque<u8>,
    capacity: usize,
}

impl TailBuffer {
    fn new(capacity: usize) -> Self {
        TailBuffer {
            bytes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let chunk = &chunk[chunk.len().saturating_sub(self.capacity)..];
        let overflow = (self.bytes.len() + chunk.len()).saturating_sub(self.capacity);
        self.bytes.drain(..overflow);
        self.bytes.extend(chunk);
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes.into()
    }
}

/// Reads `reader` to the end, returning at most its last `capacity` bytes.
fn read_tail(reader: Option<impl Read>, capacity: usize) -> io::Result<Vec<u8>> {
    let Some(mut reader) = reader else {
        return Ok(Vec::new());
    };
    let mut tail = TailBuffer::new(capacity);
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(tail.into_bytes()),
            Ok(n) => tail.push(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}
