//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// bundlecost - what an npm dependency costs your bundle
///
/// Installs the package into a throwaway workspace, bundles it with esbuild
/// and reports the minified and gzipped size of the result.
#[derive(Parser, Debug)]
#[command(name = "bundlecost")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "BUNDLECOST_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Measure the bundle size of a package
    Measure(MeasureArgs),

    /// Show which versions of a package would be measured
    Versions(VersionsArgs),

    /// Remove workspaces left behind by interrupted runs
    Clean,

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the measure command
#[derive(Parser, Debug)]
pub struct MeasureArgs {
    /// npm package name (e.g. left-pad, @babel/core)
    pub package: String,

    /// Measure these releases instead of the automatic selection
    #[arg(short, long = "release", value_name = "VERSION")]
    pub releases: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the versions command
#[derive(Parser, Debug)]
pub struct VersionsArgs {
    /// npm package name
    pub package: String,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., bundler.target)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}
