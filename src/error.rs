//! Error types for bundlecost
//!
//! Infrastructure errors use `BundleCostResult<T>`. Failures of a single
//! (package, version) build are a separate taxonomy, `PipelineFailure`, which
//! never crosses the pipeline boundary as an error: it degrades to a
//! `BundleOutcome::Failed` value instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bundlecost operations
pub type BundleCostResult<T> = Result<T, BundleCostError>;

/// All infrastructure errors that can occur in bundlecost
#[derive(Error, Debug)]
pub enum BundleCostError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Input errors
    #[error("Invalid package name: {0:?}")]
    InvalidPackageName(String),

    #[error("Invalid version: {0:?}")]
    InvalidVersion(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command timed out after {secs}s: {command}")]
    ToolTimeout { command: String, secs: u64 },

    #[error("Required tool not found: {0}")]
    ToolNotFound(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // Measurement errors
    #[error("Measuring {package} failed with status {status}")]
    MeasurementFailed { package: String, status: u16 },

    // General errors
    #[error("{0}")]
    User(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BundleCostError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::ToolNotFound(command.into());
        }
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ToolNotFound(_) => {
                Some("Install Node.js (npm) and esbuild, or set npm.program / bundler.program")
            }
            Self::ToolTimeout { .. } => {
                Some("Raise npm.install_timeout_secs or bundler.timeout_secs in the config")
            }
            Self::ConfigInvalid { .. } => Some("Run: bundlecost config init --force"),
            Self::MeasurementFailed { status: 404, .. } => {
                Some("Check the package name, or set npm.registry for private packages")
            }
            Self::MeasurementFailed { .. } => {
                Some("Re-run with -v to see install and build diagnostics")
            }
            _ => None,
        }
    }
}

/// Terminal failure of one (package, version) pipeline
#[derive(Error, Debug)]
pub enum PipelineFailure {
    #[error("workspace setup failed: {0}")]
    Workspace(String),

    #[error("install failed: {0}")]
    Install(String),

    #[error("entry point creation failed in {path}: {source}")]
    EntryPoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read installed package manifest: {0}")]
    Classify(String),

    #[error("build failed: {}", .diagnostics.join("\n"))]
    Build { diagnostics: Vec<String> },

    #[error("build produced no measurable assets")]
    NoAssets,

    #[error("could not read built asset {name}: {source}")]
    AssetRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("gave up after {attempts} attempts, still missing: {}", .missing.join(", "))]
    RetryExhausted { attempts: u32, missing: Vec<String> },

    #[error("build attempt crashed: {0}")]
    Crashed(String),
}

impl PipelineFailure {
    /// The serializable category of this failure
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Workspace(_) => FailureKind::Workspace,
            Self::Install(_) => FailureKind::Install,
            Self::EntryPoint { .. } => FailureKind::EntryPoint,
            Self::Classify(_) | Self::Build { .. } | Self::AssetRead { .. } => FailureKind::Build,
            Self::NoAssets => FailureKind::NoAssets,
            Self::RetryExhausted { .. } => FailureKind::RetryExhausted,
            Self::Crashed(_) => FailureKind::Crashed,
        }
    }
}

/// Failure category reported alongside a failed `BundleResult`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Workspace,
    Install,
    EntryPoint,
    Build,
    NoAssets,
    RetryExhausted,
    Crashed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Workspace => "workspace",
            Self::Install => "install",
            Self::EntryPoint => "entry_point",
            Self::Build => "build",
            Self::NoAssets => "no_assets",
            Self::RetryExhausted => "retry_exhausted",
            Self::Crashed => "crashed",
        };
        write!(f, "{}", name)
    }
}
