//! Classification of modules that must stay out of the measured bundle

use crate::error::PipelineFailure;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Node.js built-in modules
pub const NODE_BUILTINS: &[&str] = &[
    "assert",
    "assert/strict",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "dns/promises",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "inspector/promises",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "readline/promises",
    "repl",
    "stream",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "string_decoder",
    "sys",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "util/types",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// The subset of `package.json` the classifier reads
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, serde_json::Value>,
}

/// Modules treated as present at runtime rather than bundled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalsClassification {
    /// Declared peers, plus modules found missing by earlier attempts.
    /// esbuild also keeps their `name/...` subpaths out of the bundle.
    pub peer_packages: BTreeSet<String>,
    /// Built-ins the package does not shadow with a real dependency
    pub builtin_excludes: BTreeSet<String>,
}

impl ExternalsClassification {
    /// Classify from manifest dependency name lists
    pub fn from_dependencies<'a>(
        dependencies: impl IntoIterator<Item = &'a str>,
        peer_dependencies: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let dependencies: BTreeSet<&str> = dependencies.into_iter().collect();

        Self {
            peer_packages: peer_dependencies.into_iter().map(str::to_string).collect(),
            builtin_excludes: NODE_BUILTINS
                .iter()
                .filter(|builtin| !dependencies.contains(*builtin))
                .map(|builtin| builtin.to_string())
                .collect(),
        }
    }

    /// Add packages that must also be kept out of the bundle
    pub fn with_extra_packages<'a>(mut self, extra: impl IntoIterator<Item = &'a String>) -> Self {
        self.peer_packages.extend(extra.into_iter().cloned());
        self
    }

    /// All externals, peers first, for handing to the bundler
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.peer_packages
            .iter()
            .chain(self.builtin_excludes.iter())
            .map(String::as_str)
    }
}

/// Read the installed package's manifest and classify its externals
pub async fn classify(
    package: &str,
    module_dir: &Path,
) -> Result<ExternalsClassification, PipelineFailure> {
    let manifest_path = module_dir.join("package.json");
    let content = fs::read_to_string(&manifest_path).await.map_err(|e| {
        PipelineFailure::Classify(format!("{}: {}", manifest_path.display(), e))
    })?;
    let manifest: PackageManifest = serde_json::from_str(&content).map_err(|e| {
        PipelineFailure::Classify(format!("{}: {}", manifest_path.display(), e))
    })?;

    let classification = ExternalsClassification::from_dependencies(
        manifest.dependencies.keys().map(String::as_str),
        manifest.peer_dependencies.keys().map(String::as_str),
    );

    debug!(
        "[{}] peer externals: {:?}, built-in externals: {}",
        package,
        classification.peer_packages,
        classification.builtin_excludes.len()
    );
    Ok(classification)
}
