//! Per-attempt filesystem sandboxes
//!
//! Layout under the configured root:
//!
//! ```text
//! <root>/packages/<name>@<version>/<attempt>/   one sandbox per build attempt
//! <root>/packages/<name>@<version>/<attempt>/dist/
//! <root>/cache/                                  shared npm download cache
//! ```
//!
//! Every attempt, retries included, gets a fresh directory. A `Workspace` that
//! is dropped without `WorkspaceManager::destroy` removes itself synchronously.

use crate::config::WorkspaceConfig;
use crate::error::{BundleCostError, BundleCostResult};
use crate::package::PackageIdentifier;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// Manifest written into every new workspace
const EMPTY_MANIFEST: &str = r#"{"dependencies":{}}"#;

/// Directory (inside a workspace) receiving bundler output
pub const OUTPUT_DIR: &str = "dist";

/// An exclusively-owned sandbox directory for one build attempt
#[derive(Debug)]
pub struct Workspace {
    package: PackageIdentifier,
    path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn package(&self) -> &PackageIdentifier {
        &self.package
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the bundler writes its assets
    pub fn out_dir(&self) -> PathBuf {
        self.path.join(OUTPUT_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path.join("package.json")
    }

    /// Installed copy of a dependency
    pub fn module_dir(&self, name: &str) -> PathBuf {
        self.path.join("node_modules").join(name)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(
            "Workspace {} dropped without cleanup, removing",
            self.path.display()
        );
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Creates and destroys workspaces under the configured root
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    packages_dir: PathBuf,
    download_cache_dir: PathBuf,
}

impl WorkspaceManager {
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            packages_dir: config.packages_dir(),
            download_cache_dir: config.download_cache_dir(),
        }
    }

    /// Shared package manager cache, outside every workspace
    pub fn download_cache_dir(&self) -> &Path {
        &self.download_cache_dir
    }

    /// Directory grouping all attempts for one identifier
    pub fn package_dir(&self, package: &PackageIdentifier) -> PathBuf {
        self.packages_dir.join(package.key())
    }

    /// Sandbox path for one attempt of `package`
    pub fn attempt_dir(&self, package: &PackageIdentifier, attempt: &str) -> PathBuf {
        self.package_dir(package).join(attempt)
    }

    /// Create an empty workspace with a minimal manifest
    pub async fn create(&self, package: &PackageIdentifier) -> BundleCostResult<Workspace> {
        let attempt = Uuid::new_v4().simple().to_string();
        self.create_at(package, self.attempt_dir(package, &attempt))
            .await
    }

    async fn create_at(
        &self,
        package: &PackageIdentifier,
        path: PathBuf,
    ) -> BundleCostResult<Workspace> {
        // Overwrite-on-create: never inherit state from an earlier sandbox.
        if fs::try_exists(&path).await.unwrap_or(false) {
            debug!("Removing stale workspace {}", path.display());
            fs::remove_dir_all(&path).await.map_err(|e| {
                BundleCostError::io(format!("removing stale workspace {}", path.display()), e)
            })?;
        }

        fs::create_dir_all(&path).await.map_err(|e| {
            BundleCostError::io(format!("creating workspace {}", path.display()), e)
        })?;

        let workspace = Workspace {
            package: package.clone(),
            path,
            released: false,
        };

        fs::write(workspace.manifest_path(), EMPTY_MANIFEST)
            .await
            .map_err(|e| {
                BundleCostError::io(
                    format!("writing manifest in {}", workspace.path.display()),
                    e,
                )
            })?;

        debug!("Created workspace {}", workspace.path.display());
        Ok(workspace)
    }

    /// Remove a workspace recursively
    ///
    /// The workspace is consumed even when removal fails, so the caller can
    /// log the error without the `Drop` fallback retrying it.
    pub async fn destroy(&self, mut workspace: Workspace) -> BundleCostResult<()> {
        workspace.released = true;
        let path = workspace.path.clone();

        match fs::remove_dir_all(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(BundleCostError::io(
                    format!("removing workspace {}", path.display()),
                    e,
                ))
            }
        }

        // Only succeeds once no sibling attempt is still using the parent.
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir(parent).await;
            if workspace.package.name().starts_with('@') {
                if let Some(scope) = parent.parent() {
                    let _ = fs::remove_dir(scope).await;
                }
            }
        }

        debug!("Destroyed workspace {}", path.display());
        Ok(())
    }

    /// Remove every leftover workspace, returning how many package dirs went
    pub async fn clean_all(&self) -> BundleCostResult<usize> {
        let mut entries = match fs::read_dir(&self.packages_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(BundleCostError::io(
                    format!("listing {}", self.packages_dir.display()),
                    e,
                ))
            }
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BundleCostError::io("reading workspace entry", e))?
        {
            let path = entry.path();
            fs::remove_dir_all(&path).await.map_err(|e| {
                BundleCostError::io(format!("removing {}", path.display()), e)
            })?;
            removed += 1;
        }

        Ok(removed)
    }
}
