//! Persisted registry of sets and features.
//!
//! A single JSON file holds everything: the workspace root, the named
//! repository sets, and the active features. Loading an absent file
//! yields defaults bound to that path; `save` overwrites the whole file.
//!
//! There is no cross-process locking. Two concurrent invocations writing
//! the same file can clobber each other's updates; single-writer CLI
//! invocation is the deployment assumption.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Registry file name under the user's home directory.
pub const CONFIG_FILE_NAME: &str = ".thicketrc";

fn default_max_parallel() -> usize {
    8
}

/// A named, ordered collection of repository sources.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SetConfig {
    /// Repository URLs or local paths, in definition order.
    pub repos: Vec<String>,
    /// Source directory for the set's shared skills tree.
    #[serde(default)]
    pub skills_dir: String,
}

/// A materialized feature workspace.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeatureConfig {
    /// Feature root directory on disk.
    pub path: String,
    /// Owning set name.
    pub set: String,
}

/// The whole registry, bound to the file it was loaded from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(skip)]
    file_path: PathBuf,

    /// Directory under which feature workspaces are created.
    pub root_dir: String,

    /// Concurrency cap shared across one operation's repository fan-out.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    #[serde(default)]
    pub sets: BTreeMap<String, SetConfig>,

    #[serde(default)]
    pub features: BTreeMap<String, FeatureConfig>,
}

impl Config {
    /// Built-in defaults bound to `path` for future saves.
    pub fn default_at(path: PathBuf) -> Self {
        let root = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("thicket");
        Self {
            file_path: path,
            root_dir: root.to_string_lossy().into_owned(),
            max_parallel: default_max_parallel(),
            sets: BTreeMap::new(),
            features: BTreeMap::new(),
        }
    }

    /// The default registry location, `~/.thicketrc`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }

    /// Load the registry from `path`, or the default location if `None`.
    ///
    /// An absent file is not an error: defaults come back bound to that
    /// path. Absent maps in an existing file normalize to empty.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        if !path.exists() {
            log::info!("no registry at {}, using defaults", path.display());
            return Ok(Self::default_at(path));
        }

        let data = fs::read_to_string(&path)?;
        let mut config: Config = serde_json::from_str(&data)?;
        config.file_path = path;
        Ok(config)
    }

    /// Overwrite the registry file with the in-memory state.
    pub fn save(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(&self.file_path, data)?;
        Ok(())
    }

    /// The file this registry loads from and saves to.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Workspace root with `~` expanded.
    pub fn root(&self) -> PathBuf {
        expand_path(&self.root_dir)
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}
