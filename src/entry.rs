//! Synthesized build entry point

use crate::config::EntryStyle;
use crate::error::PipelineFailure;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File name of the synthesized entry point inside a workspace
pub const ENTRY_FILE: &str = "index.js";

/// Source of a module that imports `package` and nothing else
pub fn entry_source(package: &str, style: EntryStyle) -> String {
    match style {
        EntryStyle::Esm => format!("import * as p from '{}'; console.log(p);", package),
        EntryStyle::Cjs => format!("const p = require('{}'); console.log(p);", package),
    }
}

/// Write the entry point into `workspace` and return its absolute path
pub async fn create_entry_point(
    package: &str,
    workspace: &Path,
    style: EntryStyle,
) -> Result<PathBuf, PipelineFailure> {
    let entry_path = workspace.join(ENTRY_FILE);
    let entry_failure = |source| PipelineFailure::EntryPoint {
        path: entry_path.clone(),
        source,
    };

    debug!("Creating entry point [{}]", entry_path.display());
    fs::write(&entry_path, entry_source(package, style))
        .await
        .map_err(entry_failure)?;

    fs::canonicalize(&entry_path).await.map_err(entry_failure)
}
