//! Version selection
//!
//! Picks the releases worth measuring: the current one, the two published
//! right before it, and the newest release of the previous major line.

use crate::config::NpmConfig;
use crate::package::Version;
use crate::tool::{ToolInvocation, ToolRunner};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Lists published versions through the package manager and selects a subset
pub struct VersionSelector {
    runner: Arc<dyn ToolRunner>,
    npm: NpmConfig,
}

impl VersionSelector {
    pub fn new(runner: Arc<dyn ToolRunner>, npm: NpmConfig) -> Self {
        Self { runner, npm }
    }

    /// Versions to evaluate for `package`, current first
    ///
    /// Never fails: an unknown package, a registry error or an unparsable
    /// response all yield an empty list.
    pub async fn select(&self, package: &str) -> Vec<Version> {
        let published = self.published_versions(package).await;
        let selected = select_versions(&published);
        debug!(
            "Selected versions for [{}]: {:?}",
            package,
            selected.iter().map(|v| v.id.as_str()).collect::<Vec<_>>()
        );
        selected
    }

    /// All published versions in publish order, or empty on any failure
    pub async fn published_versions(&self, package: &str) -> Vec<String> {
        let mut invocation = ToolInvocation::new(&self.npm.program, self.npm.view_timeout())
            .args(["view", package, "versions", "--json"]);
        if let Some(registry) = &self.npm.registry {
            invocation = invocation.arg(format!("--registry={}", registry));
        }

        let output = match self.runner.run(&invocation).await {
            Ok(output) => output,
            Err(e) => {
                error!("[{}] version lookup failed: {}", package, e);
                return Vec::new();
            }
        };

        if !output.success() {
            warn!("[{}] is not an existing npm package", package);
            debug!("npm view output: {}", output.tail());
            return Vec::new();
        }

        match parse_versions(&output.stdout) {
            Some(versions) => versions,
            None => {
                error!("[{}] error when parsing the versions to fetch", package);
                Vec::new()
            }
        }
    }
}

/// Parse `npm view <pkg> versions --json` output
///
/// npm prints a JSON array, or a bare JSON string when only one version exists.
pub fn parse_versions(stdout: &str) -> Option<Vec<String>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Some(Vec::new());
    }

    match serde_json::from_str::<serde_json::Value>(trimmed).ok()? {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        serde_json::Value::String(single) => Some(vec![single]),
        _ => None,
    }
}

/// Select the versions to measure from a publish-ordered list
///
/// Result order: current, then the two releases preceding it (oldest first),
/// then the newest stable release of the previous major, deduplicated.
pub fn select_versions(published: &[String]) -> Vec<Version> {
    let Some(current) = published.last() else {
        return Vec::new();
    };

    let preceding_start = published.len().saturating_sub(3);
    let preceding = &published[preceding_start..published.len() - 1];

    let mut candidates: Vec<&String> = Vec::with_capacity(4);
    candidates.push(current);
    candidates.extend(preceding);
    if let Some(previous) = previous_major(published, current) {
        candidates.push(previous);
    }

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|id| seen.insert(*id))
        .map(|id| Version {
            id: id.clone(),
            is_current: id == current,
        })
        .collect()
}

/// Newest stable release whose major is one below the current major
fn previous_major<'a>(published: &'a [String], current: &str) -> Option<&'a String> {
    let current = semver::Version::parse(current).ok()?;
    let wanted = current.major.checked_sub(1)?;

    published.iter().rev().find(|candidate| {
        semver::Version::parse(candidate)
            .map(|v| v.major == wanted && v.pre.is_empty())
            .unwrap_or(false)
    })
}
