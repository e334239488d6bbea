//! Linked worktree operations against a bare repository.

use std::path::Path;

use crate::error::{Result, ThicketError};

use super::runner::GitRunner;

/// Create (or force-reset) `branch` and attach a linked worktree at `target`.
///
/// Uses `worktree add -B`, so running this again for a branch that already
/// exists resets the branch to its tip instead of failing.
pub async fn add(runner: &GitRunner, bare: &Path, branch: &str, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let target_str = target.to_string_lossy().into_owned();
    log::info!("adding worktree at {} (branch {})", target_str, branch);

    let result = runner
        .run(Some(bare), &["worktree", "add", "-B", branch, &target_str])
        .await;

    if let Err(err) = result {
        // git can leave a partial directory or lock files behind
        let _ = tokio::fs::remove_dir_all(target).await;
        if let ThicketError::GitFatal { output, .. } = &err {
            if output.contains("checked out") {
                return Err(ThicketError::Conflict(format!(
                    "branch '{}' is already checked out in another worktree",
                    branch
                )));
            }
        }
        return Err(err);
    }
    Ok(())
}

/// Deregister the worktree at `target` from its bare repository, forced.
///
/// The worktree's administrative entry lives under the bare repo, so this
/// must run before the worktree directory itself is deleted.
pub async fn remove(runner: &GitRunner, bare: &Path, target: &Path) -> Result<()> {
    let target_str = target.to_string_lossy().into_owned();
    runner
        .run(Some(bare), &["worktree", "remove", "--force", &target_str])
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::process::Command;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        let out = Command::new("git").args(args).current_dir(dir).output().unwrap();
        assert!(
            out.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&out.stderr)
        );
    }

    /// Init a source repo with one commit and return its bare clone path.
    fn setup_bare(temp: &TempDir) -> PathBuf {
        let source = temp.path().join("source");
        std::fs::create_dir(&source).unwrap();
        git(&source, &["init"]);
        git(&source, &["config", "user.email", "test@test.com"]);
        git(&source, &["config", "user.name", "Test"]);
        std::fs::write(source.join("README.md"), "# Test").unwrap();
        git(&source, &["add", "."]);
        git(&source, &["commit", "-m", "Initial commit"]);

        let bare = temp.path().join("bare.git");
        git(
            temp.path(),
            &[
                "clone",
                "--bare",
                &source.to_string_lossy(),
                &bare.to_string_lossy(),
            ],
        );
        bare
    }

    #[tokio::test]
    async fn test_add_creates_worktree_on_branch() {
        let temp = TempDir::new().unwrap();
        let bare = setup_bare(&temp);
        let runner = GitRunner::default();
        let target = temp.path().join("worktrees").join("repo");

        add(&runner, &bare, "my-feature", &target).await.unwrap();

        assert!(target.join("README.md").exists());
        let branch = runner
            .run(Some(&target), &["rev-parse", "--abbrev-ref", "HEAD"])
            .await
            .unwrap();
        assert_eq!(branch, "my-feature");
    }

    #[tokio::test]
    async fn test_add_same_branch_elsewhere_is_conflict() {
        let temp = TempDir::new().unwrap();
        let bare = setup_bare(&temp);
        let runner = GitRunner::default();

        let first = temp.path().join("first");
        let second = temp.path().join("second");
        add(&runner, &bare, "my-feature", &first).await.unwrap();

        let err = add(&runner, &bare, "my-feature", &second).await.unwrap_err();
        assert!(matches!(err, ThicketError::Conflict(_)));
        assert!(err.to_string().contains("my-feature"));
        // the failed target must not linger
        assert!(!second.exists());
    }

    #[tokio::test]
    async fn test_add_existing_branch_resets_it() {
        let temp = TempDir::new().unwrap();
        let bare = setup_bare(&temp);
        let runner = GitRunner::default();

        let first = temp.path().join("first");
        add(&runner, &bare, "my-feature", &first).await.unwrap();
        remove(&runner, &bare, &first).await.unwrap();

        // the branch survives worktree removal; -B resets it rather than failing
        let second = temp.path().join("second");
        add(&runner, &bare, "my-feature", &second).await.unwrap();
        assert!(second.join("README.md").exists());
    }

    #[tokio::test]
    async fn test_remove_deregisters_worktree() {
        let temp = TempDir::new().unwrap();
        let bare = setup_bare(&temp);
        let runner = GitRunner::default();
        let target = temp.path().join("worktree");

        add(&runner, &bare, "my-feature", &target).await.unwrap();
        remove(&runner, &bare, &target).await.unwrap();

        let list = runner
            .run(Some(&bare), &["worktree", "list", "--porcelain"])
            .await
            .unwrap();
        assert!(!list.contains(&target.to_string_lossy().into_owned()));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_remove_missing_worktree_errors() {
        let temp = TempDir::new().unwrap();
        let bare = setup_bare(&temp);
        let runner = GitRunner::default();

        let result = remove(&runner, &bare, &temp.path().join("never-created")).await;
        assert!(result.is_err());
    }
}
