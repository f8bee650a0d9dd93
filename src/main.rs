//! bundlecost - npm bundle size measurement
//!
//! CLI entry point that dispatches to subcommands.

use bundlecost::cli::args::ConfigAction;
use bundlecost::cli::commands;
use bundlecost::cli::{Cli, Commands};
use bundlecost::config::ConfigManager;
use bundlecost::error::BundleCostResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> BundleCostResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Init must work even when the existing file is broken
    if let Commands::Config(ref args) = cli.command {
        if let Some(ConfigAction::Init { force }) = &args.action {
            init_tracing(cli.verbose, false);
            return commands::config::init_config(&config_manager, *force).await;
        }
    }

    let config = config_manager.load().await?;
    init_tracing(cli.verbose, config.general.log_format == "json");
    bundlecost::ui::init_theme();

    match cli.command {
        Commands::Measure(args) => commands::measure(args, &config).await,
        Commands::Versions(args) => commands::versions(args, &config).await,
        Commands::Clean => commands::clean(&config).await,
        Commands::Config(args) => commands::config(args, &config_manager, &config).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; RUST_LOG overrides
fn init_tracing(verbose: u8, json: bool) {
    let default = match verbose {
        0 => "bundlecost=warn",
        1 => "bundlecost=info",
        _ => "bundlecost=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
