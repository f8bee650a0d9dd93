//! bundlecost - what an npm dependency costs your bundle
//!
//! Installs a package into a throwaway workspace, bundles it with esbuild and
//! reports the minified and gzipped size of the output. Modules the package
//! imports but never declared are installed and externalized on retry.

pub mod bundler;
pub mod cache;
pub mod cli;
pub mod config;
pub mod entry;
pub mod error;
pub mod externals;
pub mod install;
pub mod interpret;
pub mod package;
pub mod pipeline;
pub mod report;
pub mod tool;
pub mod ui;
pub mod versions;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use error::{BundleCostError, BundleCostResult};
