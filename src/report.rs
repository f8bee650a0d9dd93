//! Package-level evaluation and the report handed to callers
//!
//! A package request fans out one pipeline per selected version and waits for
//! all of them. The report then maps the per-version results to a status code
//! and JSON body:
//!
//! | Status | When | Body |
//! |--------|------|------|
//! | 200 | at least one version measured | `{data, warnings?}` |
//! | 500 | versions existed, none measured | `{errors}` |
//! | 404 | no versions found | `{errors}` |

use crate::error::BundleCostResult;
use crate::package::{validate_package_name, BundleResult, PackageIdentifier, Version};
use crate::pipeline::SizePipeline;
use crate::versions::VersionSelector;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// One evaluated version
#[derive(Debug, Clone, PartialEq)]
pub struct VersionResult {
    pub version: Version,
    pub result: BundleResult,
}

/// A measured version as it appears in the report body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasuredVersion {
    pub package_name: String,
    pub version: String,
    pub size: u64,
    pub gzip: u64,
}

/// Report body, either data (with optional warnings) or errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReportBody {
    Data {
        data: Vec<MeasuredVersion>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    Errors {
        errors: Vec<String>,
    },
}

/// All results for one package request
#[derive(Debug, Clone)]
pub struct PackageReport {
    package: String,
    results: Vec<VersionResult>,
}

impl PackageReport {
    pub fn new(package: impl Into<String>, results: Vec<VersionResult>) -> Self {
        Self {
            package: package.into(),
            results,
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn results(&self) -> &[VersionResult] {
        &self.results
    }

    fn measured(&self) -> impl Iterator<Item = &VersionResult> {
        self.results.iter().filter(|r| r.result.sizes().is_some())
    }

    fn degraded(&self) -> impl Iterator<Item = &VersionResult> {
        self.results.iter().filter(|r| r.result.sizes().is_none())
    }

    /// HTTP-style status code of the report
    pub fn status(&self) -> u16 {
        if self.results.is_empty() {
            404
        } else if self.measured().next().is_some() {
            200
        } else {
            500
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == 200
    }

    pub fn body(&self) -> ReportBody {
        match self.status() {
            404 => ReportBody::Errors {
                errors: vec![format!("[{}] Package not found", self.package)],
            },
            500 => ReportBody::Errors {
                errors: vec![format!(
                    "[{}] Error during bundle size calculation",
                    self.package
                )],
            },
            _ => ReportBody::Data {
                data: self
                    .measured()
                    .filter_map(|r| {
                        r.result.sizes().map(|sizes| MeasuredVersion {
                            package_name: r.result.package.name().to_string(),
                            version: r.result.package.version().to_string(),
                            size: sizes.size,
                            gzip: sizes.gzip,
                        })
                    })
                    .collect(),
                warnings: self
                    .degraded()
                    .map(|r| format!("Error during {} bundle size computation", r.result.package))
                    .collect(),
            },
        }
    }
}

/// Evaluates whole packages: version selection plus per-version pipelines
pub struct Evaluator {
    selector: VersionSelector,
    pipeline: SizePipeline,
}

impl Evaluator {
    pub fn new(selector: VersionSelector, pipeline: SizePipeline) -> Self {
        Self { selector, pipeline }
    }

    /// Versions of `package` that would be measured
    pub async fn select(&self, package: &str) -> BundleCostResult<Vec<Version>> {
        validate_package_name(package)?;
        Ok(self.selector.select(package).await)
    }

    /// Select versions of `package` and measure each of them
    pub async fn evaluate_package(&self, package: &str) -> BundleCostResult<PackageReport> {
        debug!("Request received for [{}]", package);
        let versions = self.select(package).await?;
        Ok(self.evaluate_versions(package, versions).await)
    }

    /// Measure the given versions of `package` concurrently
    pub async fn evaluate_versions(&self, package: &str, versions: Vec<Version>) -> PackageReport {
        self.evaluate_versions_with(package, versions, |_| {}).await
    }

    /// Like `evaluate_versions`, calling `on_done` as each version finishes
    pub async fn evaluate_versions_with<F>(
        &self,
        package: &str,
        versions: Vec<Version>,
        on_done: F,
    ) -> PackageReport
    where
        F: Fn(&VersionResult),
    {
        if versions.is_empty() {
            info!("Package does not exist for [{}]", package);
            return PackageReport::new(package, Vec::new());
        }
        debug!(
            "Versions to measure for [{}]: {:?}",
            package,
            versions.iter().map(|v| v.id.as_str()).collect::<Vec<_>>()
        );

        let on_done = &on_done;
        let results = join_all(versions.into_iter().map(|version| async move {
            let id = PackageIdentifier::new(package, version.id.as_str());
            let result = self.pipeline.evaluate(&id).await;
            let done = VersionResult { version, result };
            on_done(&done);
            done
        }))
        .await;

        let report = PackageReport::new(package, results);
        match report.status() {
            200 => {
                let failed = report.degraded().count();
                if failed > 0 {
                    warn!("{} errors for [{}]", failed, package);
                }
            }
            _ => error!("No bundle size computed for [{}]", package),
        }
        report
    }
}
