//! CLI command implementations

pub mod clean;
pub mod config;
pub mod measure;
pub mod versions;

pub use clean::execute as clean;
pub use config::execute as config;
pub use measure::execute as measure;
pub use versions::execute as versions;

use crate::cache::SizeCache;
use crate::config::Config;
use crate::pipeline::SizePipeline;
use crate::report::Evaluator;
use crate::tool::{ProcessRunner, ToolRunner};
use crate::versions::VersionSelector;
use std::sync::Arc;

/// Evaluator backed by the real npm and esbuild executables
fn evaluator(config: &Config) -> Evaluator {
    let runner: Arc<dyn ToolRunner> = Arc::new(ProcessRunner::new());
    Evaluator::new(
        VersionSelector::new(runner.clone(), config.npm.clone()),
        SizePipeline::new(config, runner, SizeCache::new()),
    )
}
