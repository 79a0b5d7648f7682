//! Configuration management for `workgraph`.
//!
//! A workspace is a `.workgraph/` directory holding the project tree and an
//! optional `config.yaml`. Resolution order for each setting:
//! 1. Command-line flag (or its environment variable, via clap)
//! 2. `config.yaml` in the workspace
//! 3. Built-in default

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of the workspace directory.
pub const WORKSPACE_DIR: &str = ".workgraph";

/// Name of the config file inside the workspace directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Actor used when nothing else names one.
pub const FALLBACK_ACTOR: &str = "unknown";

/// Template written by `wg init`.
pub const CONFIG_TEMPLATE: &str = r"# workgraph workspace configuration
# actor: alice        # recorded as created_by / updated_by
# json: false         # emit JSON by default
";

/// Contents of `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default actor for mutations.
    #[serde(default)]
    pub actor: Option<String>,

    /// Default to JSON output.
    #[serde(default)]
    pub json: bool,
}

impl Config {
    /// Load `config.yaml` from a workspace directory. A missing file is the
    /// default config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(workspace: &Path) -> Result<Self> {
        let path = workspace.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Pick the acting identity: explicit value, then config, then `$USER`.
    #[must_use]
    pub fn resolve_actor(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::trim)
            .filter(|actor| !actor.is_empty())
            .map(str::to_string)
            .or_else(|| self.actor.clone().filter(|actor| !actor.trim().is_empty()))
            .or_else(|| std::env::var("USER").ok().filter(|user| !user.is_empty()))
            .unwrap_or_else(|| FALLBACK_ACTOR.to_string())
    }
}

/// Walk up from `start` looking for a `.workgraph` directory.
#[must_use]
pub fn discover_workspace(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(WORKSPACE_DIR))
        .find(|candidate| candidate.is_dir())
}

/// Resolve the workspace directory for a command.
///
/// An explicit directory is used as-is (it need not exist yet for `init`);
/// otherwise the current directory and its ancestors are searched.
///
/// # Errors
///
/// Returns an error if no workspace is found and `must_exist` is set, or if
/// the current directory cannot be determined.
pub fn resolve_workspace(explicit: Option<&Path>, must_exist: bool) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let dir = match explicit {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => match discover_workspace(&cwd) {
            Some(found) => found,
            None if must_exist => {
                bail!("no {WORKSPACE_DIR} directory found (run `wg init` first)")
            }
            None => cwd.join(WORKSPACE_DIR),
        },
    };

    if must_exist && !dir.is_dir() {
        bail!("workspace {} does not exist (run `wg init` first)", dir.display());
    }
    Ok(dunce::canonicalize(&dir).unwrap_or(dir))
}
