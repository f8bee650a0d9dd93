//! Package identity and size data model

use crate::error::{BundleCostError, BundleCostResult, FailureKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One buildable unit, rendered canonically as `name@version`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageIdentifier {
    name: String,
    version: String,
}

impl PackageIdentifier {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Build an identifier from untrusted input
    pub fn validated(name: &str, version: &str) -> BundleCostResult<Self> {
        validate_package_name(name)?;
        let version_ok = !version.is_empty()
            && !version.starts_with('-')
            && !version.contains("..")
            && !version
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '\\'));
        if !version_ok {
            return Err(BundleCostError::InvalidVersion(version.to_string()));
        }
        Ok(Self::new(name, version))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Canonical `name@version` key, used for caching and workspace naming
    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Max length of an npm package name
const MAX_NAME_LEN: usize = 214;

/// Reject names that are not npm package names
///
/// Names end up as subprocess arguments and as path components of the
/// workspace, so anything that could escape the sandbox or be read as a flag
/// is refused here.
pub fn validate_package_name(name: &str) -> BundleCostResult<()> {
    let invalid = || BundleCostError::InvalidPackageName(name.to_string());

    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(invalid());
    }
    if name.starts_with(['.', '_', '-']) || name.contains("..") {
        return Err(invalid());
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '\\' | ':' | '"' | '\''))
    {
        return Err(invalid());
    }

    let segments: Vec<&str> = name.split('/').collect();
    let well_formed = match segments.as_slice() {
        [bare] => !bare.starts_with('@'),
        [scope, bare] => scope.len() > 1 && scope.starts_with('@') && !bare.is_empty(),
        _ => false,
    };
    if !well_formed {
        return Err(invalid());
    }

    Ok(())
}

/// A release selected for evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    /// Whether this is the package's latest published release
    pub is_current: bool,
}

/// Uncompressed and gzipped byte counts of a measured bundle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sizes {
    pub size: u64,
    pub gzip: u64,
}

impl Sizes {
    pub fn with_asset(self, stat: &AssetStat) -> Self {
        Self {
            size: self.size + stat.size,
            gzip: self.gzip + stat.gzip,
        }
    }
}

/// Size of one produced output artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetStat {
    pub name: String,
    pub size: u64,
    pub gzip: u64,
}

/// What happened to one (package, version) evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BundleOutcome {
    Measured { sizes: Sizes, cached: bool },
    Failed { kind: FailureKind, reason: String },
}

/// Result of one per-version pipeline; failures are values, never faults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleResult {
    pub package: PackageIdentifier,
    pub outcome: BundleOutcome,
}

impl BundleResult {
    pub fn measured(package: PackageIdentifier, sizes: Sizes, cached: bool) -> Self {
        Self {
            package,
            outcome: BundleOutcome::Measured { sizes, cached },
        }
    }

    pub fn failed(package: PackageIdentifier, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            package,
            outcome: BundleOutcome::Failed {
                kind,
                reason: reason.into(),
            },
        }
    }

    pub fn sizes(&self) -> Option<Sizes> {
        match self.outcome {
            BundleOutcome::Measured { sizes, .. } => Some(sizes),
            BundleOutcome::Failed { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.outcome {
            BundleOutcome::Measured { .. } => None,
            BundleOutcome::Failed { kind, .. } => Some(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_key() {
        let id = PackageIdentifier::new("left-pad", "1.3.0");
        assert_eq!(id.key(), "left-pad@1.3.0");
        assert_eq!(id.to_string(), "left-pad@1.3.0");

        let scoped = PackageIdentifier::new("@babel/core", "7.24.0");
        assert_eq!(scoped.key(), "@babel/core@7.24.0");
    }

    #[test]
    fn accepts_npm_names() {
        for name in ["left-pad", "lodash.debounce", "@babel/core", "@scope/pkg-name", "react"] {
            assert!(validate_package_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_unsafe_names() {
        for name in [
            "",
            "../etc",
            "a/../b",
            "--registry=evil",
            ".hidden",
            "two words",
            "@scope",
            "@/pkg",
            "@scope/pkg/extra",
            "plain/sub",
            "back\\slash",
        ] {
            assert!(validate_package_name(name).is_err(), "{name}");
        }
    }

    #[test]
    fn validated_identifier_checks_version() {
        assert!(PackageIdentifier::validated("left-pad", "1.3.0").is_ok());
        assert!(PackageIdentifier::validated("left-pad", "1.0.0-beta.2+build.7").is_ok());
        assert!(PackageIdentifier::validated("left-pad", "").is_err());
        assert!(PackageIdentifier::validated("left-pad", "../../x").is_err());
        assert!(PackageIdentifier::validated("left-pad", "--force").is_err());
    }

    #[test]
    fn sizes_accumulate() {
        let total = [
            AssetStat {
                name: "main".into(),
                size: 400,
                gzip: 180,
            },
            AssetStat {
                name: "style".into(),
                size: 100,
                gzip: 60,
            },
        ]
        .iter()
        .fold(Sizes::default(), Sizes::with_asset);
        assert_eq!(total, Sizes { size: 500, gzip: 240 });
    }

    #[test]
    fn failed_result_has_no_sizes() {
        let result = BundleResult::failed(
            PackageIdentifier::new("ghost", "0.0.1"),
            FailureKind::Install,
            "E404",
        );
        assert_eq!(result.sizes(), None);
        assert_eq!(result.failure_kind(), Some(FailureKind::Install));
    }
}
