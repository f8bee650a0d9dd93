//! Bundler collaborator
//!
//! A bundler turns the synthesized entry point into output assets. It is a
//! black box behind the `Bundler` trait: the pipeline only sees a manifest of
//! assets (with uncompressed sizes) or a hard failure, both carrying free-text
//! diagnostics.

mod esbuild;

pub use esbuild::EsbuildBundler;

use crate::error::BundleCostResult;
use async_trait::async_trait;
use std::path::PathBuf;

/// Input of one bundler run
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Workspace root, used as working directory
    pub workspace: PathBuf,
    /// Absolute path of the entry point
    pub entry: PathBuf,
    /// Directory receiving the produced assets
    pub out_dir: PathBuf,
    /// Module names left unresolved and excluded from the output
    pub externals: Vec<String>,
}

/// One produced output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltAsset {
    /// File name relative to the output directory
    pub name: String,
    /// Logical chunk the file belongs to
    pub chunk_name: String,
    /// Uncompressed size reported by the bundler
    pub size: u64,
}

/// What a bundler run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The build finished; warnings may still be present
    Manifest {
        assets: Vec<BuiltAsset>,
        diagnostics: Vec<String>,
    },
    /// The build failed and produced nothing usable
    Failed { diagnostics: Vec<String> },
}

/// Bundler abstraction
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Build `request.entry` into `request.out_dir`
    ///
    /// A failed build is an `Ok(BuildOutcome::Failed)`. Errors are reserved
    /// for the bundler being unavailable (missing binary, timeout, unreadable
    /// metadata).
    async fn bundle(&self, request: &BuildRequest) -> BundleCostResult<BuildOutcome>;

    /// Bundler name for logs
    fn name(&self) -> &'static str;
}

/// Lines that open a new diagnostic block
const BLOCK_MARKERS: &[&str] = &[
    "✘ [ERROR]",
    "X [ERROR]",
    "▲ [WARNING]",
    "! [WARNING]",
    "ERROR in",
    "WARNING in",
];

fn opens_block(line: &str) -> bool {
    let line = line.trim_start();
    BLOCK_MARKERS.iter().any(|marker| line.starts_with(marker))
}

/// Split bundler stderr into individual diagnostics
///
/// Output with recognizable block headers is grouped per block, continuation
/// lines included. Lines before the first block, and anything in unstructured
/// output, yield one diagnostic per non-empty line.
pub fn parse_diagnostics(stderr: &str) -> Vec<String> {
    let structured = stderr
        .lines()
        .any(|line| opens_block(line) || line.trim_start().starts_with("Module not found"));
    if !structured {
        return stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
    }

    let mut diagnostics = Vec::new();
    let mut current: Option<String> = None;

    for line in stderr.lines() {
        let bare_not_found = current.is_none() && line.trim_start().starts_with("Module not found");
        if opens_block(line) || bare_not_found {
            diagnostics.extend(current.take());
            current = Some(line.trim().to_string());
        } else if let Some(block) = current.as_mut() {
            let line = line.trim_end();
            if !line.trim().is_empty() {
                block.push('\n');
                block.push_str(line);
            }
        } else if !line.trim().is_empty() {
            diagnostics.push(line.trim().to_string());
        }
    }
    diagnostics.extend(current);

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_before_first_block_are_kept() {
        let stderr = "\
Error: Cannot find module 'react-dom/client'
  at resolve (internal)
✘ [ERROR] Unexpected \"<\"

1 error
";
        let diagnostics = parse_diagnostics(stderr);

        assert_eq!(
            diagnostics,
            vec![
                "Error: Cannot find module 'react-dom/client'".to_string(),
                "at resolve (internal)".to_string(),
                "✘ [ERROR] Unexpected \"<\"\n1 error".to_string(),
            ]
        );
        assert_eq!(
            crate::interpret::missing_modules(&diagnostics),
            vec!["react-dom"]
        );
    }

    #[test]
    fn esbuild_blocks_keep_continuation_lines() {
        let stderr = "\
✘ [ERROR] Could not resolve \"lodash/fp\"

    node_modules/pkg/index.js:1:18:
      1 │ import fp from 'lodash/fp';
        ╵                ~~~~~~~~~~~

▲ [WARNING] Unsupported source map comment

1 error
";
        let diagnostics = parse_diagnostics(stderr);

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].starts_with("✘ [ERROR] Could not resolve \"lodash/fp\""));
        assert!(diagnostics[0].contains("node_modules/pkg/index.js:1:18"));
        assert!(diagnostics[1].starts_with("▲ [WARNING]"));
        assert!(diagnostics[1].contains("1 error"));
    }

    #[test]
    fn webpack_blocks() {
        let stderr = "\
ERROR in ./node_modules/pkg/index.js 1:0-30
Module not found: Error: Can't resolve 'lodash/fp' in '/ws/node_modules/pkg'
ERROR in ./node_modules/pkg/other.js
Module not found: Error: Can't resolve 'react' in '/ws/node_modules/pkg'
";
        let diagnostics = parse_diagnostics(stderr);

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].contains("Can't resolve 'lodash/fp'"));
        assert!(diagnostics[1].contains("Can't resolve 'react'"));
    }

    #[test]
    fn bare_module_not_found_line() {
        let diagnostics =
            parse_diagnostics("Module not found: Error: Can't resolve 'react' in '/ws'\n");
        assert_eq!(
            diagnostics,
            vec!["Module not found: Error: Can't resolve 'react' in '/ws'".to_string()]
        );
    }

    #[test]
    fn unstructured_output_is_split_per_line() {
        let diagnostics = parse_diagnostics("\nsegmentation fault\n  core dumped  \n");
        assert_eq!(diagnostics, vec!["segmentation fault", "core dumped"]);
    }

    #[test]
    fn empty_output_has_no_diagnostics() {
        assert!(parse_diagnostics("").is_empty());
    }
}
