//! Configuration schema for bundlecost
//!
//! Configuration is stored at `~/.config/bundlecost/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Workspace (sandbox) settings
    pub workspace: WorkspaceConfig,

    /// Package manager settings
    pub npm: NpmConfig,

    /// Bundler settings
    pub bundler: BundlerConfig,

    /// Build-and-measure loop settings
    pub pipeline: PipelineConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Workspace settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Root directory holding `packages/` sandboxes and the shared `cache/`
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("bundlecost"),
        }
    }
}

impl WorkspaceConfig {
    /// Directory containing one sandbox per build attempt
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    /// Package manager download cache shared by all installs
    pub fn download_cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }
}

/// Package manager settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NpmConfig {
    /// Package manager executable
    pub program: String,

    /// Registry URL passed as `--registry` (npm default when unset)
    pub registry: Option<String>,

    /// Timeout for one `npm install` in seconds
    pub install_timeout_secs: u64,

    /// Timeout for one `npm view` in seconds
    pub view_timeout_secs: u64,
}

impl Default for NpmConfig {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
            registry: None,
            install_timeout_secs: 300,
            view_timeout_secs: 60,
        }
    }
}

impl NpmConfig {
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    pub fn view_timeout(&self) -> Duration {
        Duration::from_secs(self.view_timeout_secs)
    }
}

/// How the synthesized entry point imports the package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStyle {
    /// `import * as p from 'pkg'`
    #[default]
    Esm,
    /// `const p = require('pkg')`
    Cjs,
}

/// Bundler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
    /// Bundler executable
    pub program: String,

    /// Timeout for one bundler run in seconds
    pub timeout_secs: u64,

    /// ECMAScript target
    pub target: String,

    /// esbuild platform (browser, node, neutral)
    pub platform: String,

    /// Import style of the synthesized entry point
    pub entry_style: EntryStyle,

    /// Extensions emitted as separate files instead of being inlined
    pub file_loaders: Vec<String>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            program: "esbuild".to_string(),
            timeout_secs: 300,
            target: "es2017".to_string(),
            platform: "browser".to_string(),
            entry_style: EntryStyle::Esm,
            file_loaders: [
                "woff", "woff2", "eot", "ttf", "svg", "png", "jpeg", "jpg", "gif", "webp",
            ]
            .iter()
            .map(|ext| ext.to_string())
            .collect(),
        }
    }
}

impl BundlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Build-and-measure loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum install/build attempts per version, retries included
    pub max_attempts: u32,

    /// Chunk name whose assets are never counted
    pub runtime_chunk: String,

    /// Asset file names containing one of these are never counted
    pub license_markers: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            runtime_chunk: "runtime".to_string(),
            license_markers: vec!["LICENSE".to_string(), "LEGAL".to_string()],
        }
    }
}
