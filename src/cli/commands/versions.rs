//! Versions command - show which releases would be measured

use super::evaluator;
use crate::cli::args::{OutputFormat, VersionsArgs};
use crate::config::Config;
use crate::error::{BundleCostError, BundleCostResult};
use crate::ui::{self, UiContext};
use console::style;

/// Execute the versions command
pub async fn execute(args: VersionsArgs, config: &Config) -> BundleCostResult<()> {
    let versions = evaluator(config).select(&args.package).await?;

    if versions.is_empty() {
        return Err(BundleCostError::MeasurementFailed {
            package: args.package,
            status: 404,
        });
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&versions)?),
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::intro(&ctx, &args.package);
            for version in &versions {
                if version.is_current {
                    println!("{} {}", version.id, style("(latest)").dim());
                } else {
                    println!("{}", version.id);
                }
            }
            ui::outro_success(&ctx, &format!("{} version(s)", versions.len()));
        }
    }

    Ok(())
}
