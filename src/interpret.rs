//! Build result interpretation
//!
//! Decides what a bundler outcome means for the pipeline: a measurement, a
//! set of missing modules to retry with, or a terminal failure.
//!
//! The bundler only reports unresolved modules as free text, so detection is
//! pattern matching over known message formats:
//!
//! ```text
//! webpack  Module not found: Error: Can't resolve 'lodash/fp' in '/ws'
//! esbuild  ✘ [ERROR] Could not resolve "lodash/fp"
//! node     Error: Cannot find module 'lodash/fp'
//! ```

use crate::bundler::{BuildOutcome, BuiltAsset};
use crate::config::PipelineConfig;
use crate::error::PipelineFailure;
use crate::package::{AssetStat, Sizes};
use flate2::write::GzEncoder;
use flate2::Compression;
use regex::Regex;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;
use tokio::fs;
use tracing::debug;

static MISSING_MODULE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"Can't resolve '([^']+)'"#,
        r#"Could not resolve "([^"]+)""#,
        r#"Cannot find module '([^']+)'"#,
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// What the pipeline should do after one build attempt
#[derive(Debug)]
pub enum Interpretation {
    /// Final sizes, with the assets that were counted
    Measured { sizes: Sizes, assets: Vec<AssetStat> },
    /// Retry with these packages installed and externalized
    MissingDependencies {
        missing: Vec<String>,
        diagnostics: Vec<String>,
    },
    /// Terminal failure for this attempt
    Failed(PipelineFailure),
}

/// Reduce a module specifier to the package that provides it
///
/// Returns `None` for relative and absolute paths.
pub fn normalize_package_name(specifier: &str) -> Option<String> {
    let specifier = specifier.trim();
    if specifier.is_empty()
        || specifier.starts_with('.')
        || specifier.starts_with('/')
        || specifier.starts_with('\\')
        || specifier.contains(':')
    {
        return None;
    }

    let mut segments = specifier.split('/');
    let first = segments.next()?;
    if first.starts_with('@') {
        let name = segments.next().filter(|name| !name.is_empty())?;
        Some(format!("{}/{}", first, name))
    } else {
        Some(first.to_string())
    }
}

/// Packages named by "module not found" diagnostics, deduplicated in order
pub fn missing_modules(diagnostics: &[String]) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();

    for diagnostic in diagnostics {
        for pattern in MISSING_MODULE_PATTERNS.iter() {
            for captures in pattern.captures_iter(diagnostic) {
                let Some(name) = captures.get(1).and_then(|m| normalize_package_name(m.as_str()))
                else {
                    continue;
                };
                if !missing.contains(&name) {
                    missing.push(name);
                }
            }
        }
    }

    missing
}

/// Compressed length of `bytes` with gzip at default settings
pub fn gzip_len(bytes: &[u8]) -> std::io::Result<u64> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?.len() as u64)
}

/// Interprets bundler outcomes
#[derive(Debug, Clone)]
pub struct Interpreter {
    runtime_chunk: String,
    license_markers: Vec<String>,
}

impl Interpreter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            runtime_chunk: config.runtime_chunk.clone(),
            license_markers: config.license_markers.clone(),
        }
    }

    /// Whether an asset contributes to the measured size
    pub fn is_counted(&self, asset: &BuiltAsset) -> bool {
        asset.chunk_name != self.runtime_chunk
            && !self
                .license_markers
                .iter()
                .any(|marker| asset.name.contains(marker.as_str()))
    }

    pub async fn interpret(&self, outcome: BuildOutcome, out_dir: &Path) -> Interpretation {
        match outcome {
            BuildOutcome::Failed { diagnostics } => {
                let missing = missing_modules(&diagnostics);
                if missing.is_empty() {
                    Interpretation::Failed(PipelineFailure::Build { diagnostics })
                } else {
                    debug!("Build reported missing modules: {:?}", missing);
                    Interpretation::MissingDependencies {
                        missing,
                        diagnostics,
                    }
                }
            }
            BuildOutcome::Manifest {
                assets,
                diagnostics,
            } => {
                if assets.is_empty() && diagnostics.len() > 1 {
                    return Interpretation::Failed(PipelineFailure::Build { diagnostics });
                }
                self.measure(assets, out_dir).await
            }
        }
    }

    async fn measure(&self, assets: Vec<BuiltAsset>, out_dir: &Path) -> Interpretation {
        let mut counted = Vec::new();

        for asset in assets.into_iter().filter(|asset| self.is_counted(asset)) {
            let bytes = match fs::read(out_dir.join(&asset.name)).await {
                Ok(bytes) => bytes,
                Err(source) => {
                    return Interpretation::Failed(PipelineFailure::AssetRead {
                        name: asset.name,
                        source,
                    })
                }
            };
            let gzip = match gzip_len(&bytes) {
                Ok(gzip) => gzip,
                Err(source) => {
                    return Interpretation::Failed(PipelineFailure::AssetRead {
                        name: asset.name,
                        source,
                    })
                }
            };
            debug!("Asset {}: {} bytes, {} gzipped", asset.name, asset.size, gzip);
            counted.push(AssetStat {
                name: asset.name,
                size: asset.size,
                gzip,
            });
        }

        if counted.is_empty() {
            return Interpretation::Failed(PipelineFailure::NoAssets);
        }

        let sizes = counted.iter().fold(Sizes::default(), Sizes::with_asset);
        Interpretation::Measured {
            sizes,
            assets: counted,
        }
    }
}
