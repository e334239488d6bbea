//! Per-repository status probing and report aggregation.

use std::path::Path;

use crate::error::Result;
use crate::git::GitRunner;

/// Sentinel ahead/behind value for branches with no configured upstream.
pub const NO_UPSTREAM: &str = "no upstream";

/// Snapshot of one repository inside a feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus {
    /// Repository short name.
    pub name: String,
    /// Currently checked-out branch.
    pub branch: String,
    /// Whether the worktree has uncommitted changes.
    pub dirty: bool,
    /// `"<ahead>\t<behind>"` relative to upstream, or [`NO_UPSTREAM`].
    pub ahead_behind: String,
}

/// Probe one worktree for its branch, dirty flag, and ahead/behind counts.
pub async fn probe(runner: &GitRunner, name: &str, worktree: &Path) -> Result<RepoStatus> {
    let branch = runner
        .run(Some(worktree), &["rev-parse", "--abbrev-ref", "HEAD"])
        .await?;
    let porcelain = runner.run(Some(worktree), &["status", "--porcelain"]).await?;
    let ahead_behind = match runner
        .run(
            Some(worktree),
            &["rev-list", "--left-right", "--count", "HEAD...@{u}"],
        )
        .await
    {
        Ok(counts) => counts,
        // rev-list fails when no upstream is configured
        Err(_) => NO_UPSTREAM.to_string(),
    };

    Ok(RepoStatus {
        name: name.to_string(),
        branch,
        dirty: !porcelain.is_empty(),
        ahead_behind,
    })
}

/// Order a report by repository short name.
///
/// Probe tasks complete in scheduler order; sorting makes repeated
/// invocations byte-identical.
pub fn sort_report(mut statuses: Vec<RepoStatus>) -> Vec<RepoStatus> {
    statuses.sort_by(|a, b| a.name.cmp(&b.name));
    statuses
}
