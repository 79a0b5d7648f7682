use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;
use workgraph_core::FsStore;

use crate::config::{CONFIG_FILE, CONFIG_TEMPLATE};
use crate::format::Output;

/// Execute the init command.
///
/// Safe to run twice: existing projects and config are left alone.
///
/// # Errors
///
/// Returns an error if the workspace directory cannot be created or is not
/// writable.
pub fn execute(workspace: &Path, output: Output) -> Result<()> {
    let existed = workspace.is_dir();
    fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create {}", workspace.display()))?;

    FsStore::new(workspace).init()?;

    let config_path = workspace.join(CONFIG_FILE);
    if !config_path.exists() {
        fs::write(&config_path, CONFIG_TEMPLATE)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
    }

    let path = dunce::canonicalize(workspace).unwrap_or_else(|_| workspace.to_path_buf());
    info!(path = %path.display(), existed, "Initialized workspace");
    output.emit(
        &json!({ "workspace": path, "created": !existed }),
        || {
            if existed {
                format!("Workspace already initialized at {}", path.display())
            } else {
                format!("Initialized workgraph workspace in {}", path.display())
            }
        },
    )
}
