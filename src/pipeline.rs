//! Per-version build-and-measure pipeline
//!
//! One evaluation runs install, entry synthesis, externals classification,
//! bundling and interpretation in sequence inside a fresh workspace. When the
//! bundler reports unresolved modules, the whole sequence is repeated in a new
//! workspace with those modules installed and externalized, up to
//! `pipeline.max_attempts` attempts.
//!
//! Every outcome, including a panic inside an attempt, is returned as a
//! `BundleResult`. The attempt's workspace is destroyed on every path.

use crate::bundler::{BuildRequest, Bundler, EsbuildBundler};
use crate::cache::SizeCache;
use crate::config::{Config, EntryStyle};
use crate::entry::create_entry_point;
use crate::error::PipelineFailure;
use crate::externals::classify;
use crate::install::Installer;
use crate::interpret::{Interpretation, Interpreter};
use crate::package::{validate_package_name, BundleResult, PackageIdentifier, Sizes};
use crate::tool::ToolRunner;
use crate::workspace::{Workspace, WorkspaceManager};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds and measures one package version at a time
pub struct SizePipeline {
    workspaces: WorkspaceManager,
    installer: Installer,
    bundler: Arc<dyn Bundler>,
    interpreter: Interpreter,
    cache: SizeCache,
    entry_style: EntryStyle,
    max_attempts: u32,
}

impl SizePipeline {
    /// Pipeline using esbuild through `runner`
    pub fn new(config: &Config, runner: Arc<dyn ToolRunner>, cache: SizeCache) -> Self {
        let bundler = Arc::new(EsbuildBundler::new(runner.clone(), config.bundler.clone()));
        Self::with_bundler(config, runner, bundler, cache)
    }

    pub fn with_bundler(
        config: &Config,
        runner: Arc<dyn ToolRunner>,
        bundler: Arc<dyn Bundler>,
        cache: SizeCache,
    ) -> Self {
        Self {
            workspaces: WorkspaceManager::new(&config.workspace),
            installer: Installer::new(runner, config.npm.clone()),
            bundler,
            interpreter: Interpreter::new(&config.pipeline),
            cache,
            entry_style: config.bundler.entry_style,
            max_attempts: config.pipeline.max_attempts.max(1),
        }
    }

    /// Measure `package`, consulting the cache first
    pub async fn evaluate(&self, package: &PackageIdentifier) -> BundleResult {
        if let Some(sizes) = self.cache.get(package).await {
            debug!("Cache hit for {}", package);
            return BundleResult::measured(package.clone(), sizes, true);
        }

        match self.measure(package).await {
            Ok(sizes) => {
                info!(
                    "Measured {}: {} bytes, {} gzipped",
                    package, sizes.size, sizes.gzip
                );
                self.cache.put(package, sizes).await;
                BundleResult::measured(package.clone(), sizes, false)
            }
            Err(failure) => {
                warn!("Failed to measure {}: {}", package, failure);
                BundleResult::failed(package.clone(), failure.kind(), failure.to_string())
            }
        }
    }

    /// The retry loop over attempts
    async fn measure(&self, package: &PackageIdentifier) -> Result<Sizes, PipelineFailure> {
        let mut extra_dependencies: Vec<String> = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for attempt in 1..=self.max_attempts {
            debug!("Attempt {}/{} for {}", attempt, self.max_attempts, package);

            match self.attempt(package, &extra_dependencies).await {
                Interpretation::Measured { sizes, assets } => {
                    debug!("{} counted {} assets", package, assets.len());
                    return Ok(sizes);
                }
                Interpretation::Failed(failure) => return Err(failure),
                Interpretation::MissingDependencies {
                    missing,
                    diagnostics,
                } => {
                    let new = new_dependencies(package, &extra_dependencies, &missing);
                    if new.is_empty() {
                        if !missing.iter().any(|name| extra_dependencies.contains(name)) {
                            debug!(
                                "{} reports only unrecoverable modules {:?}",
                                package, missing
                            );
                            return Err(PipelineFailure::Build { diagnostics });
                        }
                        warn!(
                            "{} still reports missing modules {:?} after installing them",
                            package, missing
                        );
                        return Err(PipelineFailure::RetryExhausted {
                            attempts: attempt,
                            missing,
                        });
                    }
                    info!("Retrying {} with extra dependencies {:?}", package, new);
                    extra_dependencies.extend(new.iter().cloned());
                    pending = new;
                }
            }
        }

        Err(PipelineFailure::RetryExhausted {
            attempts: self.max_attempts,
            missing: pending,
        })
    }

    /// Run one attempt in a fresh workspace and always tear it down
    async fn attempt(
        &self,
        package: &PackageIdentifier,
        extra_dependencies: &[String],
    ) -> Interpretation {
        let workspace = match self.workspaces.create(package).await {
            Ok(workspace) => workspace,
            Err(e) => return Interpretation::Failed(PipelineFailure::Workspace(e.to_string())),
        };

        let interpretation = AssertUnwindSafe(self.run_attempt(&workspace, extra_dependencies))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(PipelineFailure::Crashed(panic_message(panic.as_ref())))
            })
            .unwrap_or_else(Interpretation::Failed);

        if let Err(e) = self.workspaces.destroy(workspace).await {
            warn!("Workspace cleanup failed for {}: {}", package, e);
        }

        interpretation
    }

    async fn run_attempt(
        &self,
        workspace: &Workspace,
        extra_dependencies: &[String],
    ) -> Result<Interpretation, PipelineFailure> {
        let package = workspace.package();

        self.installer
            .install(workspace, &self.workspaces, extra_dependencies)
            .await?;

        let entry = create_entry_point(package.name(), workspace.path(), self.entry_style).await?;

        let externals = classify(package.name(), &workspace.module_dir(package.name()))
            .await?
            .with_extra_packages(extra_dependencies);

        let request = BuildRequest {
            workspace: workspace.path().to_path_buf(),
            entry,
            out_dir: workspace.out_dir(),
            externals: externals.names().map(str::to_string).collect(),
        };

        debug!("Bundling {} with {}", package, self.bundler.name());
        let outcome = self
            .bundler
            .bundle(&request)
            .await
            .map_err(|e| PipelineFailure::Build {
                diagnostics: vec![e.to_string()],
            })?;

        Ok(self.interpreter.interpret(outcome, &request.out_dir).await)
    }
}

/// Reported modules not yet requested, excluding the package itself and
/// anything that is not a valid package name
fn new_dependencies(
    package: &PackageIdentifier,
    requested: &[String],
    missing: &[String],
) -> Vec<String> {
    missing
        .iter()
        .filter(|name| name.as_str() != package.name() && !requested.contains(name))
        .filter(|name| match validate_package_name(name) {
            Ok(()) => true,
            Err(e) => {
                warn!("Ignoring missing module for {}: {}", package, e);
                false
            }
        })
        .cloned()
        .collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
