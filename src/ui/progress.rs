//! Progress indicators with CI fallback

use super::context::UiContext;
use crate::report::VersionResult;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Bar counting finished versions of one package
///
/// Plain mode prints one line per finished version instead.
pub struct MeasureProgress {
    bar: Option<ProgressBar>,
}

impl MeasureProgress {
    pub fn new(ctx: &UiContext, package: &str, versions: usize) -> Self {
        if !ctx.use_fancy_output() {
            println!("Measuring {} version(s) of {}...", versions, package);
            return Self { bar: None };
        }

        let bar = ProgressBar::new(versions as u64);
        if let Ok(bar_style) = ProgressStyle::default_bar().template(
            "  {spinner:.cyan} Measuring {prefix}  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}",
        ) {
            bar.set_style(
                bar_style
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                    .progress_chars("━╸─"),
            );
        }
        bar.set_prefix(package.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar: Some(bar) }
    }

    /// Record one finished version
    pub fn on_done(&self, done: &VersionResult) {
        let verdict = match done.result.sizes() {
            Some(sizes) => format!("{} ({} gzipped)", format_bytes(sizes.size), format_bytes(sizes.gzip)),
            None => "failed".to_string(),
        };
        match &self.bar {
            Some(bar) => {
                bar.inc(1);
                bar.set_message(format!("{} {}", done.version.id, verdict));
            }
            None => println!("  {} {}", done.version.id, verdict),
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// Human-readable byte count (1000-based, like bundle size tooling)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["kB", "MB", "GB"];
    if bytes < 1000 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1000.0 {
            break;
        }
        value /= 1000.0;
        unit = next;
    }
    format!("{:.1} {}", value, unit)
}
