//! Package installation into a workspace via npm

use crate::config::NpmConfig;
use crate::error::PipelineFailure;
use crate::package::PackageIdentifier;
use crate::tool::{ToolInvocation, ToolRunner};
use crate::workspace::{Workspace, WorkspaceManager};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// npm flags for a reproducible, side-effect free production install.
///
/// The download cache is passed separately: it is shared by every
/// concurrent install, which npm tolerates.
const INSTALL_FLAGS: &[&str] = &[
    "--no-package-lock",
    "--no-shrinkwrap",
    "--no-optional",
    "--no-bin-links",
    "--prefer-offline",
    "--progress=false",
    "--loglevel=error",
    "--ignore-scripts",
    "--save-exact",
    "--production",
    "--json",
];

/// Installs a package (and any extra dependencies) into a workspace
pub struct Installer {
    runner: Arc<dyn ToolRunner>,
    npm: NpmConfig,
}

impl Installer {
    pub fn new(runner: Arc<dyn ToolRunner>, npm: NpmConfig) -> Self {
        Self { runner, npm }
    }

    /// Build the `npm install` invocation for one attempt
    pub fn invocation(
        &self,
        package: &PackageIdentifier,
        extra_dependencies: &[String],
        workspace: &Path,
        download_cache: &Path,
    ) -> ToolInvocation {
        let mut invocation = ToolInvocation::new(&self.npm.program, self.npm.install_timeout())
            .cwd(workspace)
            .arg("install")
            .arg(package.key())
            .args(extra_dependencies.iter().cloned())
            .arg(format!("--cache={}", download_cache.display()))
            .args(INSTALL_FLAGS.iter().copied());

        if let Some(registry) = &self.npm.registry {
            invocation = invocation.arg(format!("--registry={}", registry));
        }

        invocation
    }

    /// Install `package` plus `extra_dependencies` into `workspace`
    pub async fn install(
        &self,
        workspace: &Workspace,
        manager: &WorkspaceManager,
        extra_dependencies: &[String],
    ) -> Result<(), PipelineFailure> {
        let package = workspace.package();
        let invocation = self.invocation(
            package,
            extra_dependencies,
            workspace.path(),
            manager.download_cache_dir(),
        );

        info!("Installing {}", package);
        if !extra_dependencies.is_empty() {
            debug!("Extra dependencies for {}: {:?}", package, extra_dependencies);
        }

        let output = self
            .runner
            .run(&invocation)
            .await
            .map_err(|e| PipelineFailure::Install(e.to_string()))?;

        if output.success() {
            Ok(())
        } else {
            Err(PipelineFailure::Install(format!(
                "{} exited with {}: {}",
                invocation.display(),
                output
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                output.tail()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkspaceConfig;
    use crate::error::BundleCostResult;
    use crate::tool::ToolOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingRunner {
        exit_code: i32,
        calls: Mutex<Vec<ToolInvocation>>,
    }

    #[async_trait]
    impl ToolRunner for RecordingRunner {
        async fn run(&self, invocation: &ToolInvocation) -> BundleCostResult<ToolOutput> {
            self.calls.lock().unwrap().push(invocation.clone());
            Ok(ToolOutput {
                code: Some(self.exit_code),
                stdout: String::new(),
                stderr: "npm ERR! 404 Not Found - GET https://registry.npmjs.org/ghost".into(),
            })
        }
    }

    #[test]
    fn invocation_flags() {
        let installer = Installer::new(Arc::new(RecordingRunner::default()), NpmConfig::default());
        let inv = installer.invocation(
            &PackageIdentifier::new("lodash-es", "4.17.21"),
            &["react".to_string()],
            Path::new("/ws"),
            Path::new("/root/cache"),
        );

        assert_eq!(inv.program, "npm");
        assert_eq!(inv.cwd.as_deref(), Some(Path::new("/ws")));
        assert_eq!(&inv.args[..3], ["install", "lodash-es@4.17.21", "react"]);
        for flag in [
            "--cache=/root/cache",
            "--no-package-lock",
            "--no-shrinkwrap",
            "--no-optional",
            "--no-bin-links",
            "--ignore-scripts",
            "--prefer-offline",
            "--production",
            "--save-exact",
        ] {
            assert!(inv.args.iter().any(|a| a == flag), "missing {flag}");
        }
    }

    #[test]
    fn invocation_uses_custom_registry() {
        let npm = NpmConfig {
            registry: Some("https://npm.internal".to_string()),
            ..Default::default()
        };
        let installer = Installer::new(Arc::new(RecordingRunner::default()), npm);
        let inv = installer.invocation(
            &PackageIdentifier::new("react", "18.2.0"),
            &[],
            Path::new("/ws"),
            Path::new("/cache"),
        );
        assert!(inv.args.contains(&"--registry=https://npm.internal".to_string()));
    }

    #[tokio::test]
    async fn non_zero_exit_is_install_failure() {
        let dir = TempDir::new().unwrap();
        let manager = WorkspaceManager::new(&WorkspaceConfig {
            root: dir.path().to_path_buf(),
        });
        let ws = manager
            .create(&PackageIdentifier::new("ghost", "9.9.9"))
            .await
            .unwrap();
        let runner = Arc::new(RecordingRunner {
            exit_code: 1,
            ..Default::default()
        });
        let installer = Installer::new(runner.clone(), NpmConfig::default());

        let err = installer.install(&ws, &manager, &[]).await.unwrap_err();

        assert!(matches!(err, PipelineFailure::Install(ref msg) if msg.contains("404")));
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
        manager.destroy(ws).await.unwrap();
    }
}
