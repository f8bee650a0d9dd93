//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, EntryStyle};
use crate::error::{BundleCostError, BundleCostResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "workspace.root",
    "npm.program",
    "npm.registry",
    "npm.install_timeout_secs",
    "npm.view_timeout_secs",
    "bundler.program",
    "bundler.timeout_secs",
    "bundler.target",
    "bundler.platform",
    "bundler.entry_style",
    "bundler.file_loaders",
    "pipeline.max_attempts",
    "pipeline.runtime_chunk",
    "pipeline.license_markers",
];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    manager: &ConfigManager,
    config: &Config,
) -> BundleCostResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            set_value(manager, config, &key, &value).await?
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> BundleCostResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

/// Write the default configuration, keeping an existing file unless forced
pub async fn init_config(manager: &ConfigManager, force: bool) -> BundleCostResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;

    ui::step_ok_detail(
        &ctx,
        "Configuration initialized",
        &path.display().to_string(),
    );

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> BundleCostResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    if let Err(e) = apply(&mut config, key, value) {
        if matches!(&e, BundleCostError::User(msg) if msg.starts_with("Unknown config key")) {
            ui::step_error_detail(&ctx, "Unknown config key", key);
            ui::remark(&ctx, "Valid keys:");
            for key in VALID_KEYS {
                eprintln!("  {}", key);
            }
        }
        return Err(e);
    }

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply one dot-separated `key = value` assignment
fn apply(config: &mut Config, key: &str, value: &str) -> BundleCostResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(BundleCostError::User(format!(
                    "Invalid log format: {}. Use text/json",
                    value
                )))
            }
        },

        ["workspace", "root"] => {
            if value.is_empty() {
                return Err(BundleCostError::User(
                    "workspace.root must not be empty".to_string(),
                ));
            }
            config.workspace.root = PathBuf::from(value);
        }

        ["npm", "program"] => config.npm.program = value.to_string(),
        ["npm", "registry"] => {
            config.npm.registry = Some(value.to_string()).filter(|v| !v.is_empty())
        }
        ["npm", "install_timeout_secs"] => config.npm.install_timeout_secs = parse_u64(value)?,
        ["npm", "view_timeout_secs"] => config.npm.view_timeout_secs = parse_u64(value)?,

        ["bundler", "program"] => config.bundler.program = value.to_string(),
        ["bundler", "timeout_secs"] => config.bundler.timeout_secs = parse_u64(value)?,
        ["bundler", "target"] => config.bundler.target = value.to_string(),
        ["bundler", "platform"] => match value {
            "browser" | "node" | "neutral" => config.bundler.platform = value.to_string(),
            _ => {
                return Err(BundleCostError::User(format!(
                    "Invalid platform: {}. Use browser/node/neutral",
                    value
                )))
            }
        },
        ["bundler", "entry_style"] => config.bundler.entry_style = parse_entry_style(value)?,
        ["bundler", "file_loaders"] => config.bundler.file_loaders = parse_list(value),

        ["pipeline", "max_attempts"] => {
            let attempts = parse_u64(value)?;
            if attempts == 0 || attempts > u64::from(u32::MAX) {
                return Err(BundleCostError::User(format!(
                    "Invalid attempt count: {}",
                    value
                )));
            }
            config.pipeline.max_attempts = attempts as u32;
        }
        ["pipeline", "runtime_chunk"] => config.pipeline.runtime_chunk = value.to_string(),
        ["pipeline", "license_markers"] => config.pipeline.license_markers = parse_list(value),

        _ => {
            return Err(BundleCostError::User(format!(
                "Unknown config key: {}",
                key
            )))
        }
    }

    Ok(())
}

fn parse_u64(value: &str) -> BundleCostResult<u64> {
    value
        .parse()
        .map_err(|_| BundleCostError::User(format!("Invalid number: {}", value)))
}

fn parse_entry_style(value: &str) -> BundleCostResult<EntryStyle> {
    match value.to_lowercase().as_str() {
        "esm" => Ok(EntryStyle::Esm),
        "cjs" => Ok(EntryStyle::Cjs),
        _ => Err(BundleCostError::User(format!(
            "Invalid entry style: {}. Use esm/cjs",
            value
        ))),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn apply_sets_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "bundler.entry_style", "cjs").unwrap();
        apply(&mut config, "bundler.file_loaders", "png, svg,,woff2").unwrap();
        apply(&mut config, "npm.registry", "https://npm.example.com").unwrap();
        apply(&mut config, "pipeline.max_attempts", "3").unwrap();

        assert_eq!(config.bundler.entry_style, EntryStyle::Cjs);
        assert_eq!(config.bundler.file_loaders, vec!["png", "svg", "woff2"]);
        assert_eq!(
            config.npm.registry.as_deref(),
            Some("https://npm.example.com")
        );
        assert_eq!(config.pipeline.max_attempts, 3);

        apply(&mut config, "npm.registry", "").unwrap();
        assert_eq!(config.npm.registry, None);
    }

    #[test]
    fn apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "pipeline.max_attempts", "0").is_err());
        assert!(apply(&mut config, "npm.install_timeout_secs", "soon").is_err());
        assert!(apply(&mut config, "general.log_format", "xml").is_err());
        assert!(apply(&mut config, "bundler.platform", "deno").is_err());
        assert!(apply(&mut config, "bundler.entry_style", "amd").is_err());
        assert!(matches!(
            apply(&mut config, "vm.name", "x"),
            Err(BundleCostError::User(msg)) if msg.contains("Unknown config key")
        ));
    }

    #[test]
    fn every_listed_key_is_settable() {
        for key in VALID_KEYS {
            let mut config = Config::default();
            let value = match *key {
                "general.log_format" => "json",
                "bundler.platform" => "node",
                "bundler.entry_style" => "esm",
                k if k.ends_with("_secs") || k.ends_with("max_attempts") => "7",
                _ => "value",
            };
            assert!(apply(&mut config, key, value).is_ok(), "{key}");
        }
    }

    #[tokio::test]
    async fn init_then_set_persists() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("config.toml"));

        init_config(&manager, false).await.unwrap();
        let config = manager.load().await.unwrap();
        set_value(&manager, &config, "bundler.target", "es2020")
            .await
            .unwrap();

        let reloaded = manager.load().await.unwrap();
        assert_eq!(reloaded.bundler.target, "es2020");
    }

    #[tokio::test]
    async fn init_keeps_existing_file_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bundler]\ntarget = \"es2022\"\n").unwrap();
        let manager = ConfigManager::with_path(path.clone());

        init_config(&manager, false).await.unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("es2022"));

        init_config(&manager, true).await.unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("es2017"));
    }
}
