//! Feature lifecycle orchestration.
//!
//! `FeatureManager` owns the registry, the bare-repository cache, and the
//! git runner, and fans every multi-repository operation out across the
//! owning set's repositories — one bounded task per repository, joined,
//! with all per-repository failures aggregated.

pub mod fanout;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{BareRepoCache, short_name};
use crate::config::{Config, FeatureConfig, SetConfig};
use crate::error::{Result, ThicketError};
use crate::git::{ExecOutput, GitRunner, worktree};
use crate::skills;
use crate::status::{self, RepoStatus};

/// One repository of a set, resolved against a feature root.
#[derive(Debug, Clone)]
struct RepoTarget {
    name: String,
    source: String,
    worktree: PathBuf,
}

fn targets(set: &SetConfig, feature_root: &Path) -> Vec<RepoTarget> {
    set.repos
        .iter()
        .map(|source| {
            let name = short_name(source);
            let worktree = feature_root.join(&name);
            RepoTarget {
                name,
                source: source.clone(),
                worktree,
            }
        })
        .collect()
}

/// Output of one command run inside one repository's worktree.
#[derive(Debug, Clone)]
pub struct RepoExec {
    /// Repository short name.
    pub name: String,
    /// Combined stdout and stderr.
    pub output: String,
    /// Process exit code.
    pub exit_code: i32,
}

impl RepoExec {
    /// Whether the command exited zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Aggregated outcome of a command fanned out across a feature.
#[derive(Debug, Clone, Default)]
pub struct ExecReport {
    /// Per-repository runs, in set order.
    pub runs: Vec<RepoExec>,
    /// How many repositories failed (non-zero exit or spawn failure).
    pub failed: usize,
}

/// Orchestrates set and feature lifecycles over the registry, the bare
/// cache, and the git runner.
pub struct FeatureManager {
    config: Config,
    runner: Arc<GitRunner>,
    cache: Arc<BareRepoCache>,
}

impl FeatureManager {
    /// Build a manager over a loaded registry, with the bare cache in its
    /// default location (`~/.thicket/cache`).
    pub fn new(config: Config) -> Self {
        let cache_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".thicket")
            .join("cache");
        Self::with_cache_dir(config, cache_dir)
    }

    /// Build a manager with an explicit cache directory.
    pub fn with_cache_dir(config: Config, cache_dir: impl Into<PathBuf>) -> Self {
        let runner = Arc::new(GitRunner::default());
        let cache = Arc::new(BareRepoCache::new(cache_dir, runner.clone()));
        let manager = Self {
            config,
            runner,
            cache,
        };
        manager.reconcile();
        manager
    }

    /// The registry this manager operates on.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Warn about registered features whose paths no longer exist.
    ///
    /// A crash between worktree creation and persist, or a manual delete,
    /// leaves stale entries; they are reported, never auto-pruned.
    fn reconcile(&self) {
        for (name, feature) in &self.config.features {
            if !Path::new(&feature.path).exists() {
                log::warn!(
                    "feature '{}' is registered but {} is missing; `remove {}` clears it",
                    name,
                    feature.path,
                    name
                );
            }
        }
    }

    fn set(&self, name: &str) -> Result<&SetConfig> {
        self.config
            .sets
            .get(name)
            .ok_or_else(|| ThicketError::SetNotFound(name.to_string()))
    }

    fn feature(&self, name: &str) -> Result<&FeatureConfig> {
        self.config
            .features
            .get(name)
            .ok_or_else(|| ThicketError::FeatureNotFound(name.to_string()))
    }

    /// Resolve a feature plus its owning set.
    fn feature_and_set(&self, name: &str) -> Result<(&FeatureConfig, &SetConfig)> {
        let feature = self.feature(name)?;
        let set = self.set(&feature.set)?;
        Ok((feature, set))
    }

    /// Root directory of a feature workspace, for `switch` and shortcuts.
    pub fn feature_path(&self, name: &str) -> Result<PathBuf> {
        Ok(PathBuf::from(&self.feature(name)?.path))
    }

    // --- set operations ---

    /// Define a new set of repositories.
    pub fn add_set(&mut self, name: &str, repos: Vec<String>) -> Result<()> {
        if self.config.sets.contains_key(name) {
            return Err(ThicketError::AlreadyExists(format!("set '{}'", name)));
        }

        // worktree paths are keyed by short name, so duplicates collide
        let mut seen = HashSet::new();
        for repo in &repos {
            let short = short_name(repo);
            if !seen.insert(short.clone()) {
                return Err(ThicketError::Conflict(format!(
                    "set '{}' would contain two repositories named '{}'",
                    name, short
                )));
            }
        }

        let skills_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".thicket")
            .join("skills")
            .join(name);

        self.config.sets.insert(
            name.to_string(),
            SetConfig {
                repos,
                skills_dir: skills_dir.to_string_lossy().into_owned(),
            },
        );
        self.config.save()
    }

    /// Remove a set definition. Blocked while any feature references it.
    pub fn remove_set(&mut self, name: &str) -> Result<()> {
        if !self.config.sets.contains_key(name) {
            return Err(ThicketError::SetNotFound(name.to_string()));
        }
        if let Some((feature, _)) = self.config.features.iter().find(|(_, f)| f.set == name) {
            return Err(ThicketError::Conflict(format!(
                "set '{}' is still used by feature '{}'",
                name, feature
            )));
        }

        self.config.sets.remove(name);
        self.config.save()
    }

    /// Update a set's skills source directory.
    pub fn set_skills_dir(&mut self, set_name: &str, path: &str) -> Result<()> {
        let set = self
            .config
            .sets
            .get_mut(set_name)
            .ok_or_else(|| ThicketError::SetNotFound(set_name.to_string()))?;
        set.skills_dir = path.to_string();
        self.config.save()
    }

    // --- feature operations ---

    /// Materialize a feature: one worktree per repository in the set, all
    /// on a branch named after the feature.
    ///
    /// The feature is registered and persisted only after every
    /// repository finished; a failed fan-out reports all failing
    /// repositories and leaves the registry untouched.
    pub async fn create_feature(&mut self, set_name: &str, feature_name: &str) -> Result<()> {
        let set = self.set(set_name)?.clone();
        if self.config.features.contains_key(feature_name) {
            return Err(ThicketError::AlreadyExists(format!(
                "feature '{}'",
                feature_name
            )));
        }

        let set_root = self.config.root().join(set_name);
        let feature_root = set_root.join(feature_name);
        if feature_root.exists() {
            return Err(ThicketError::AlreadyExists(format!(
                "directory {}",
                feature_root.display()
            )));
        }

        log::info!(
            "creating feature '{}' for set '{}' at {}",
            feature_name,
            set_name,
            feature_root.display()
        );
        tokio::fs::create_dir_all(&feature_root).await?;

        let tasks = targets(&set, &feature_root)
            .into_iter()
            .map(|target| {
                let cache = self.cache.clone();
                let runner = self.runner.clone();
                let branch = feature_name.to_string();
                (
                    target.name.clone(),
                    create_worktree_task(cache, runner, target, branch),
                )
            })
            .collect();
        let outcomes = fanout::for_each(tasks, self.config.max_parallel).await;
        fanout::collect("feature creation", outcomes)?;

        // best-effort: a broken skills copy never aborts the feature
        if let Err(err) = skills::sync_set_skills(&set, &set_root) {
            log::warn!("failed to sync skills for set '{}': {}", set_name, err);
        }

        self.config.features.insert(
            feature_name.to_string(),
            FeatureConfig {
                path: feature_root.to_string_lossy().into_owned(),
                set: set_name.to_string(),
            },
        );
        self.config.save()
    }

    /// Tear a feature down: deregister every worktree, delete the feature
    /// root, drop the registry entry.
    pub async fn remove_feature(&mut self, feature_name: &str) -> Result<()> {
        let feature = self.feature(feature_name)?.clone();
        log::info!("removing feature '{}'", feature_name);

        // Deregistration must precede directory deletion: the worktree's
        // administrative entry lives under the bare repo, and a deleted
        // directory without it blocks later reuse of the path or branch.
        // The set may have been deleted out of band; removal proceeds.
        match self.config.sets.get(&feature.set).cloned() {
            Some(set) => {
                let feature_root = PathBuf::from(&feature.path);
                let tasks = targets(&set, &feature_root)
                    .into_iter()
                    .map(|target| {
                        let runner = self.runner.clone();
                        let bare = self.cache.bare_path(&target.source);
                        (
                            target.name.clone(),
                            remove_worktree_task(runner, bare, target.worktree),
                        )
                    })
                    .collect();
                for (name, outcome) in fanout::for_each(tasks, self.config.max_parallel).await {
                    if let Err(err) = outcome {
                        log::warn!("failed to deregister worktree for {}: {}", name, err);
                    }
                }
            }
            None => {
                log::warn!(
                    "set '{}' for feature '{}' no longer exists; skipping worktree deregistration",
                    feature.set,
                    feature_name
                );
            }
        }

        if Path::new(&feature.path).exists() {
            tokio::fs::remove_dir_all(&feature.path).await?;
        }

        self.config.features.remove(feature_name);
        self.config.save()
    }

    /// Fetch every repository and pull the ones with an upstream.
    ///
    /// Repositories without an upstream fetch and succeed; every failure
    /// across the set is aggregated into one error.
    pub async fn sync_feature(&self, feature_name: &str) -> Result<()> {
        let (feature, set) = self.feature_and_set(feature_name)?;
        let feature_root = PathBuf::from(&feature.path);
        log::info!("syncing feature '{}' (set '{}')", feature_name, feature.set);

        let tasks = targets(set, &feature_root)
            .into_iter()
            .map(|target| {
                let runner = self.runner.clone();
                (target.name, sync_repo_task(runner, target.worktree))
            })
            .collect();
        let outcomes = fanout::for_each(tasks, self.config.max_parallel).await;
        fanout::collect("sync", outcomes).map(|_| ())
    }

    /// Run a command in every repository's worktree.
    ///
    /// Failures never cancel sibling repositories and never fail the
    /// call; the report carries each repository's output and the failure
    /// count so the caller can pick an exit status.
    pub async fn exec_feature(
        &self,
        feature_name: &str,
        program: &str,
        args: &[String],
    ) -> Result<ExecReport> {
        let (feature, set) = self.feature_and_set(feature_name)?;
        let feature_root = PathBuf::from(&feature.path);
        log::info!(
            "running '{}' across {} repo(s) of feature '{}'",
            program,
            set.repos.len(),
            feature_name
        );

        let tasks = targets(set, &feature_root)
            .into_iter()
            .map(|target| {
                let runner = self.runner.clone();
                let program = program.to_string();
                let args = args.to_vec();
                (
                    target.name.clone(),
                    exec_task(runner, target.worktree, program, args),
                )
            })
            .collect();
        let outcomes = fanout::for_each(tasks, self.config.max_parallel).await;

        let mut report = ExecReport::default();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(out) => {
                    if !out.success() {
                        report.failed += 1;
                    }
                    report.runs.push(RepoExec {
                        name,
                        output: out.output,
                        exit_code: out.exit_code,
                    });
                }
                Err(err) => {
                    report.failed += 1;
                    report.runs.push(RepoExec {
                        name,
                        output: err.to_string(),
                        exit_code: -1,
                    });
                }
            }
        }
        Ok(report)
    }

    /// Probe every repository and return the report sorted by short name.
    pub async fn feature_status(&self, feature_name: &str) -> Result<Vec<RepoStatus>> {
        let (feature, set) = self.feature_and_set(feature_name)?;
        let feature_root = PathBuf::from(&feature.path);

        let tasks = targets(set, &feature_root)
            .into_iter()
            .map(|target| {
                let runner = self.runner.clone();
                (
                    target.name.clone(),
                    probe_task(runner, target.name, target.worktree),
                )
            })
            .collect();
        let outcomes = fanout::for_each(tasks, self.config.max_parallel).await;
        let statuses = fanout::collect("status", outcomes)?;
        Ok(status::sort_report(statuses))
    }
}

async fn create_worktree_task(
    cache: Arc<BareRepoCache>,
    runner: Arc<GitRunner>,
    target: RepoTarget,
    branch: String,
) -> Result<()> {
    let bare = cache.ensure(&target.source).await?;
    worktree::add(&runner, &bare, &branch, &target.worktree).await
}

async fn remove_worktree_task(
    runner: Arc<GitRunner>,
    bare: PathBuf,
    target: PathBuf,
) -> Result<()> {
    worktree::remove(&runner, &bare, &target).await
}

async fn sync_repo_task(runner: Arc<GitRunner>, worktree: PathBuf) -> Result<()> {
    runner.run(Some(&worktree), &["fetch", "--all"]).await?;

    // a branch without an upstream fetches but never pulls
    if runner
        .run(Some(&worktree), &["rev-parse", "--abbrev-ref", "@{u}"])
        .await
        .is_err()
    {
        log::info!("no upstream in {}, skipping pull", worktree.display());
        return Ok(());
    }

    runner.run(Some(&worktree), &["pull"]).await?;
    Ok(())
}

async fn exec_task(
    runner: Arc<GitRunner>,
    worktree: PathBuf,
    program: String,
    args: Vec<String>,
) -> Result<ExecOutput> {
    runner.run_external(&worktree, &program, &args).await
}

async fn probe_task(runner: Arc<GitRunner>, name: String, worktree: PathBuf) -> Result<RepoStatus> {
    status::probe(&runner, &name, &worktree).await
}
