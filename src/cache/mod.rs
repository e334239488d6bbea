//! Shared bare-repository cache.
//!
//! Every set and feature referencing the same repository shares one bare
//! clone, keyed by the repository's short name. Entries are created
//! lazily and never deleted by feature removal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::git::GitRunner;

/// Derive a repository's short name from its URL or path.
///
/// The last path segment with any `.git` suffix stripped:
/// `git@github.com:user/repo.git` -> `repo`, `/home/user/repo` -> `repo`.
pub fn short_name(identifier: &str) -> String {
    let normalized = identifier.replace('\\', "/");
    let trimmed = normalized.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// Lazily populated cache of bare clones, shared by every feature.
#[derive(Debug)]
pub struct BareRepoCache {
    cache_dir: PathBuf,
    runner: Arc<GitRunner>,
    /// One lock per repository identity. Racing `ensure` calls for the
    /// same identity serialize on it; distinct identities never contend.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl BareRepoCache {
    /// Create a cache rooted at `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>, runner: Arc<GitRunner>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            runner,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The cache root directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path the bare clone for `identifier` occupies (whether or not it
    /// exists yet).
    pub fn bare_path(&self, identifier: &str) -> PathBuf {
        self.cache_dir.join(short_name(identifier))
    }

    /// Return the bare clone for `source`, cloning it first if absent.
    ///
    /// The existence check and the clone both run under the identity's
    /// lock, so two features created at nearly the same time perform
    /// exactly one clone between them.
    pub async fn ensure(&self, source: &str) -> Result<PathBuf> {
        let name = short_name(source);
        let identity_lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(name.clone()).or_default().clone()
        };
        let _guard = identity_lock.lock().await;

        let bare = self.cache_dir.join(&name);
        if bare.exists() {
            return Ok(bare);
        }

        tokio::fs::create_dir_all(&self.cache_dir).await?;
        log::info!("cloning {} into {}", source, bare.display());
        let bare_str = bare.to_string_lossy().into_owned();
        self.runner
            .run(None, &["clone", "--bare", source, &bare_str])
            .await?;
        Ok(bare)
    }
}
