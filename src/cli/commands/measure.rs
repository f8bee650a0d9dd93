//! Measure command - build a package and report its size

use super::evaluator;
use crate::cli::args::{MeasureArgs, OutputFormat};
use crate::config::Config;
use crate::error::{BundleCostError, BundleCostResult};
use crate::package::{BundleOutcome, PackageIdentifier, Version};
use crate::report::{PackageReport, VersionResult};
use crate::ui::{self, format_bytes, MeasureProgress, TaskSpinner, UiContext};
use console::style;

/// Execute the measure command
pub async fn execute(args: MeasureArgs, config: &Config) -> BundleCostResult<()> {
    let ctx = match args.format {
        OutputFormat::Table => UiContext::detect(),
        OutputFormat::Json => UiContext::non_interactive(),
    };
    let evaluator = evaluator(config);

    let versions = if args.releases.is_empty() {
        let mut spinner = quiet_spinner(&ctx, args.format);
        if let Some(spinner) = spinner.as_mut() {
            spinner.start(&format!("Looking up versions of {}", args.package));
        }
        let versions = evaluator.select(&args.package).await?;
        if let Some(spinner) = spinner.as_mut() {
            if versions.is_empty() {
                spinner.stop_error(&format!("No published versions of {}", args.package));
            } else {
                spinner.stop(&format!("{} version(s) selected", versions.len()));
            }
        }
        versions
    } else {
        explicit_versions(&args.package, &args.releases)?
    };

    let report = if versions.is_empty() || args.format == OutputFormat::Json {
        evaluator.evaluate_versions(&args.package, versions).await
    } else {
        let progress = MeasureProgress::new(&ctx, &args.package, versions.len());
        let report = evaluator
            .evaluate_versions_with(&args.package, versions, |done| progress.on_done(done))
            .await;
        progress.finish();
        report
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report.body())?),
        OutputFormat::Table => print_table(&ctx, &report),
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(BundleCostError::MeasurementFailed {
            package: args.package,
            status: report.status(),
        })
    }
}

fn quiet_spinner(ctx: &UiContext, format: OutputFormat) -> Option<TaskSpinner> {
    match format {
        OutputFormat::Table => Some(TaskSpinner::new(ctx)),
        OutputFormat::Json => None,
    }
}

/// Versions given on the command line, validated
fn explicit_versions(package: &str, releases: &[String]) -> BundleCostResult<Vec<Version>> {
    releases
        .iter()
        .map(|release| {
            PackageIdentifier::validated(package, release).map(|id| Version {
                id: id.version().to_string(),
                is_current: false,
            })
        })
        .collect()
}

fn print_table(ctx: &UiContext, report: &PackageReport) {
    if report.results().is_empty() {
        return;
    }

    ui::intro(ctx, report.package());

    println!(
        "{:<20} {:>12} {:>12}  {}",
        style("VERSION").bold(),
        style("MINIFIED").bold(),
        style("GZIPPED").bold(),
        style("NOTE").bold()
    );
    println!("{}", "-".repeat(60));

    for VersionResult { version, result } in report.results() {
        let label = if version.is_current {
            format!("{} (latest)", version.id)
        } else {
            version.id.clone()
        };

        match &result.outcome {
            BundleOutcome::Measured { sizes, cached } => println!(
                "{:<20} {:>12} {:>12}  {}",
                label,
                format_bytes(sizes.size),
                format_bytes(sizes.gzip),
                if *cached { style("cached").dim() } else { style("") }
            ),
            BundleOutcome::Failed { kind, .. } => println!(
                "{:<20} {:>12} {:>12}  {}",
                label,
                "-",
                "-",
                style(kind).red()
            ),
        }
    }

    for result in report.results() {
        if let BundleOutcome::Failed { reason, .. } = &result.result.outcome {
            ui::step_warn(ctx, &format!("{}: {}", result.result.package, first_line(reason)));
        }
    }

    if report.is_success() {
        ui::outro_success(ctx, "Done");
    } else {
        ui::outro_error(ctx, "No version could be measured");
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}
