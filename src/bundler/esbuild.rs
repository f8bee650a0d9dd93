//! esbuild-backed bundler, driven through the esbuild CLI

use super::{parse_diagnostics, BuildOutcome, BuildRequest, BuiltAsset, Bundler};
use crate::config::BundlerConfig;
use crate::error::{BundleCostError, BundleCostResult};
use crate::tool::{ToolInvocation, ToolRunner};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Build metadata written next to the entry point, outside the output dir
const METAFILE: &str = "meta.json";

/// Chunk name of the entry bundle
const ENTRY_CHUNK: &str = "main";

#[derive(Debug, Deserialize)]
struct Metafile {
    #[serde(default)]
    outputs: BTreeMap<String, MetafileOutput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafileOutput {
    bytes: u64,
    #[serde(default)]
    entry_point: Option<String>,
}

/// esbuild bundler
pub struct EsbuildBundler {
    runner: Arc<dyn ToolRunner>,
    config: BundlerConfig,
}

impl EsbuildBundler {
    pub fn new(runner: Arc<dyn ToolRunner>, config: BundlerConfig) -> Self {
        Self { runner, config }
    }

    /// Build the esbuild command line for `request`
    pub fn invocation(&self, request: &BuildRequest) -> ToolInvocation {
        ToolInvocation::new(&self.config.program, self.config.timeout())
            .cwd(&request.workspace)
            .arg(request.entry.display().to_string())
            .args([
                "--bundle",
                "--minify",
                "--format=esm",
                "--color=false",
                "--log-level=warning",
                "--legal-comments=external",
                "--entry-names=main.bundle",
                "--asset-names=[name]-[hash]",
            ])
            .arg(format!("--target={}", self.config.target))
            .arg(format!("--platform={}", self.config.platform))
            .arg(format!("--outdir={}", request.out_dir.display()))
            .arg(format!(
                "--metafile={}",
                request.workspace.join(METAFILE).display()
            ))
            .args(
                self.config
                    .file_loaders
                    .iter()
                    .map(|ext| format!("--loader:.{}=file", ext)),
            )
            .args(
                request
                    .externals
                    .iter()
                    .map(|name| format!("--external:{}", name)),
            )
    }
}

/// Turn esbuild metadata into an asset manifest
///
/// Metafile output keys are relative to the working directory (the workspace);
/// asset names are made relative to the output directory.
fn assets_from_metafile(
    content: &str,
    workspace: &Path,
    out_dir: &Path,
) -> BundleCostResult<Vec<BuiltAsset>> {
    let metafile: Metafile = serde_json::from_str(content)?;

    Ok(metafile
        .outputs
        .into_iter()
        .map(|(key, output)| {
            let absolute = workspace.join(&key);
            let name = absolute
                .strip_prefix(out_dir)
                .map(|relative| relative.to_string_lossy().replace('\\', "/"))
                .unwrap_or(key);
            let chunk_name = if output.entry_point.is_some() {
                ENTRY_CHUNK.to_string()
            } else {
                Path::new(&name)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| name.clone())
            };
            BuiltAsset {
                name,
                chunk_name,
                size: output.bytes,
            }
        })
        .collect())
}

#[async_trait]
impl Bundler for EsbuildBundler {
    async fn bundle(&self, request: &BuildRequest) -> BundleCostResult<BuildOutcome> {
        fs::create_dir_all(&request.out_dir).await.map_err(|e| {
            BundleCostError::io(
                format!("creating output dir {}", request.out_dir.display()),
                e,
            )
        })?;

        let invocation = self.invocation(request);
        debug!("Running {}", invocation.display());
        let output = self.runner.run(&invocation).await?;

        let mut diagnostics = parse_diagnostics(&output.stderr);
        if !output.success() {
            if diagnostics.is_empty() {
                diagnostics.push(format!(
                    "{} exited with {:?}: {}",
                    self.config.program,
                    output.code,
                    output.tail()
                ));
            }
            return Ok(BuildOutcome::Failed { diagnostics });
        }

        let metafile_path = request.workspace.join(METAFILE);
        let content = fs::read_to_string(&metafile_path).await.map_err(|e| {
            BundleCostError::io(format!("reading {}", metafile_path.display()), e)
        })?;
        let assets = assets_from_metafile(&content, &request.workspace, &request.out_dir)?;
        debug!("esbuild produced {} assets", assets.len());

        Ok(BuildOutcome::Manifest {
            assets,
            diagnostics,
        })
    }

    fn name(&self) -> &'static str {
        "esbuild"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolOutput;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Plays esbuild: writes a fixed metafile into the working directory
    struct MetafileRunner {
        code: i32,
        stderr: String,
        metafile: Option<String>,
        calls: Mutex<Vec<ToolInvocation>>,
    }

    impl MetafileRunner {
        fn new(code: i32, stderr: &str, metafile: Option<&str>) -> Self {
            Self {
                code,
                stderr: stderr.to_string(),
                metafile: metafile.map(str::to_string),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ToolRunner for MetafileRunner {
        async fn run(&self, invocation: &ToolInvocation) -> BundleCostResult<ToolOutput> {
            self.calls.lock().unwrap().push(invocation.clone());
            if let (Some(content), Some(cwd)) = (&self.metafile, &invocation.cwd) {
                std::fs::write(cwd.join(METAFILE), content).unwrap();
            }
            Ok(ToolOutput {
                code: Some(self.code),
                stdout: String::new(),
                stderr: self.stderr.clone(),
            })
        }
    }

    fn request(workspace: &Path) -> BuildRequest {
        BuildRequest {
            workspace: workspace.to_path_buf(),
            entry: workspace.join("index.js"),
            out_dir: workspace.join("dist"),
            externals: vec!["react".to_string(), "fs".to_string()],
        }
    }

    #[test]
    fn invocation_arguments() {
        let bundler = EsbuildBundler::new(
            Arc::new(MetafileRunner::new(0, "", None)),
            BundlerConfig::default(),
        );
        let inv = bundler.invocation(&request(Path::new("/ws")));

        assert_eq!(inv.program, "esbuild");
        assert_eq!(inv.cwd, Some(PathBuf::from("/ws")));
        assert_eq!(inv.args[0], "/ws/index.js");
        for arg in [
            "--bundle",
            "--minify",
            "--format=esm",
            "--target=es2017",
            "--platform=browser",
            "--outdir=/ws/dist",
            "--metafile=/ws/meta.json",
            "--entry-names=main.bundle",
            "--loader:.woff2=file",
            "--external:react",
            "--external:fs",
        ] {
            assert!(inv.args.iter().any(|a| a == arg), "missing {arg}");
        }
    }

    #[test]
    fn metafile_outputs_become_assets() {
        let metafile = r#"{
            "inputs": {},
            "outputs": {
                "dist/main.bundle.js": {"bytes": 400, "entryPoint": "index.js", "imports": []},
                "dist/main.bundle.js.LEGAL.txt": {"bytes": 1100},
                "dist/font-5PSXB6AU.woff2": {"bytes": 2048}
            }
        }"#;

        let mut assets =
            assets_from_metafile(metafile, Path::new("/ws"), Path::new("/ws/dist")).unwrap();
        assets.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            assets,
            vec![
                BuiltAsset {
                    name: "font-5PSXB6AU.woff2".into(),
                    chunk_name: "font-5PSXB6AU".into(),
                    size: 2048,
                },
                BuiltAsset {
                    name: "main.bundle.js".into(),
                    chunk_name: "main".into(),
                    size: 400,
                },
                BuiltAsset {
                    name: "main.bundle.js.LEGAL.txt".into(),
                    chunk_name: "main.bundle.js.LEGAL".into(),
                    size: 1100,
                },
            ]
        );
    }

    #[test]
    fn malformed_metafile_is_an_error() {
        let err = assets_from_metafile("{not json", Path::new("/ws"), Path::new("/ws/dist"))
            .unwrap_err();
        assert!(matches!(err, BundleCostError::Json(_)));
    }

    #[tokio::test]
    async fn successful_run_returns_manifest() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(MetafileRunner::new(
            0,
            "▲ [WARNING] Unsupported source map comment\n",
            Some(r#"{"outputs": {"dist/main.bundle.js": {"bytes": 400, "entryPoint": "index.js"}}}"#),
        ));
        let bundler = EsbuildBundler::new(runner.clone(), BundlerConfig::default());

        let outcome = bundler.bundle(&request(dir.path())).await.unwrap();

        match outcome {
            BuildOutcome::Manifest {
                assets,
                diagnostics,
            } => {
                assert_eq!(assets.len(), 1);
                assert_eq!(assets[0].chunk_name, "main");
                assert_eq!(diagnostics.len(), 1);
            }
            other => panic!("expected manifest, got {:?}", other),
        }
        assert!(dir.path().join("dist").is_dir());
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_run_returns_diagnostics() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(MetafileRunner::new(
            1,
            "✘ [ERROR] Could not resolve \"lodash/fp\"\n\n1 error\n",
            None,
        ));
        let bundler = EsbuildBundler::new(runner, BundlerConfig::default());

        let outcome = bundler.bundle(&request(dir.path())).await.unwrap();

        assert_eq!(
            outcome,
            BuildOutcome::Failed {
                diagnostics: vec!["✘ [ERROR] Could not resolve \"lodash/fp\"\n1 error".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn silent_failure_still_has_a_diagnostic() {
        let dir = TempDir::new().unwrap();
        let bundler = EsbuildBundler::new(
            Arc::new(MetafileRunner::new(2, "", None)),
            BundlerConfig::default(),
        );

        let outcome = bundler.bundle(&request(dir.path())).await.unwrap();

        match outcome {
            BuildOutcome::Failed { diagnostics } => {
                assert_eq!(diagnostics.len(), 1);
                assert!(diagnostics[0].contains("esbuild exited"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
