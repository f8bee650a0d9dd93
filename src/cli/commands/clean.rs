//! Clean command - remove leftover workspaces

use crate::config::Config;
use crate::error::BundleCostResult;
use crate::ui::{self, UiContext};
use crate::workspace::WorkspaceManager;

/// Execute the clean command
pub async fn execute(config: &Config) -> BundleCostResult<()> {
    let ctx = UiContext::detect();
    let manager = WorkspaceManager::new(&config.workspace);

    match manager.clean_all().await? {
        0 => ui::step_info(&ctx, "No leftover workspaces"),
        removed => ui::step_ok(
            &ctx,
            &format!(
                "Removed {} package workspace(s) under {}",
                removed,
                config.workspace.packages_dir().display()
            ),
        ),
    }

    Ok(())
}
