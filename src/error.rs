//! Error types for thicket
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// One repository's failure inside a fanned-out operation.
#[derive(Debug, Error)]
#[error("{repo}: {source}")]
pub struct RepoFailure {
    /// Repository short name.
    pub repo: String,
    /// The underlying failure.
    #[source]
    pub source: Box<ThicketError>,
}

impl RepoFailure {
    /// Label an error with the repository it came from.
    pub fn new(repo: impl Into<String>, source: ThicketError) -> Self {
        Self {
            repo: repo.into(),
            source: Box::new(source),
        }
    }
}

/// All error types that can occur in thicket
#[derive(Debug, Error)]
pub enum ThicketError {
    /// Set not found in the registry
    #[error("set '{0}' not found")]
    SetNotFound(String),

    /// Feature not found in the registry
    #[error("feature '{0}' not found")]
    FeatureNotFound(String),

    /// Duplicate name, or the target directory is already on disk
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Operation blocked by conflicting state
    #[error("conflict: {0}")]
    Conflict(String),

    /// Lock contention that survived the retry budget
    #[error("git {command} failed after retrying lock contention\n{output}")]
    GitTransient { command: String, output: String },

    /// Any other non-zero git exit
    #[error("git {command} failed\n{output}")]
    GitFatal { command: String, output: String },

    /// Combined per-repository failures from one multi-repo operation
    #[error("{operation} failed in {} repo(s):\n{}", .failures.len(), format_failures(.failures))]
    Fanout {
        operation: String,
        failures: Vec<RepoFailure>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_failures(failures: &[RepoFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("  {}", failure))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type alias for thicket operations
pub type Result<T> = std::result::Result<T, ThicketError>;
