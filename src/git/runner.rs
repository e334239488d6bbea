//! Subprocess execution for git and arbitrary commands.
//!
//! Failed git invocations are classified once, here, into a typed
//! transient/fatal kind; the retry policy consumes only the type and
//! never inspects process output itself.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{Result, ThicketError};

/// Classification of a non-zero git exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Lock contention, safe to retry after a short backoff.
    Transient,
    /// Everything else; retrying will not help.
    Fatal,
}

/// Classify combined output from a failed git invocation.
pub fn classify(output: &str) -> FailureKind {
    if output.contains("index.lock") || output.contains("lock file") {
        FailureKind::Transient
    } else {
        FailureKind::Fatal
    }
}

/// Output of an arbitrary (non-git) command.
///
/// A non-zero exit is data here, not an error: the caller decides how
/// to report it.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Combined stdout and stderr.
    pub output: String,
    /// Process exit code, -1 when terminated by a signal.
    pub exit_code: i32,
}

impl ExecOutput {
    /// Whether the command exited zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs git (and arbitrary) subcommands in a working directory.
#[derive(Debug, Clone)]
pub struct GitRunner {
    max_attempts: u32,
    backoff: Duration,
}

impl Default for GitRunner {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl GitRunner {
    /// Create a runner with a custom retry budget (tests shrink the backoff).
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Run a git command, retrying transient lock failures.
    ///
    /// Returns trimmed combined stdout+stderr on success. A lock-contention
    /// failure is retried up to the attempt budget and then surfaced as
    /// `GitTransient`; any other failure is `GitFatal` immediately.
    pub async fn run(&self, cwd: Option<&Path>, args: &[&str]) -> Result<String> {
        let command = args.join(" ");
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut cmd = Command::new("git");
            cmd.args(args);
            if let Some(dir) = cwd {
                cmd.current_dir(dir);
            }
            let out = cmd.output().await?;
            let combined = combine_output(&out.stdout, &out.stderr);
            if out.status.success() {
                return Ok(combined.trim().to_string());
            }

            match classify(&combined) {
                FailureKind::Transient if attempt < self.max_attempts => {
                    log::debug!(
                        "git {} hit lock contention (attempt {}/{}), backing off",
                        command,
                        attempt,
                        self.max_attempts
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                FailureKind::Transient => {
                    return Err(ThicketError::GitTransient {
                        command,
                        output: combined,
                    });
                }
                FailureKind::Fatal => {
                    return Err(ThicketError::GitFatal {
                        command,
                        output: combined,
                    });
                }
            }
        }
    }

    /// Run an arbitrary command with no retry.
    ///
    /// A non-zero exit comes back inside [`ExecOutput`], not as an error;
    /// only failure to spawn at all (missing binary, bad directory) errors.
    pub async fn run_external(&self, cwd: &Path, program: &str, args: &[String]) -> Result<ExecOutput> {
        let out = Command::new(program).args(args).current_dir(cwd).output().await?;
        Ok(ExecOutput {
            output: combine_output(&out.stdout, &out.stderr).trim_end().to_string(),
            exit_code: out.status.code().unwrap_or(-1),
        })
    }
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    if stderr.is_empty() {
        stdout.into_owned()
    } else if stdout.is_empty() {
        stderr.into_owned()
    } else {
        format!("{}\n{}", stdout, stderr)
    }
}
