//! In-memory size cache
//!
//! Holds measured sizes for the lifetime of the process, keyed by
//! `name@version`. One instance is created at startup and shared by every
//! pipeline through cheap clones. There is no eviction and no persistence.
//!
//! Concurrent misses on the same key are not coalesced: both pipelines build
//! and both write. Sizes of a published version are deterministic, so the
//! last write wins with the same value.

use crate::package::{PackageIdentifier, Sizes};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A cached measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CachedSizes {
    pub sizes: Sizes,
    pub computed_at: DateTime<Utc>,
}

/// Shared, process-lifetime cache of measured sizes
#[derive(Debug, Clone, Default)]
pub struct SizeCache {
    entries: Arc<RwLock<HashMap<String, CachedSizes>>>,
}

impl SizeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, package: &PackageIdentifier) -> Option<Sizes> {
        self.entries
            .read()
            .await
            .get(&package.key())
            .map(|entry| entry.sizes)
    }

    pub async fn put(&self, package: &PackageIdentifier, sizes: Sizes) {
        let previous = self.entries.write().await.insert(
            package.key(),
            CachedSizes {
                sizes,
                computed_at: Utc::now(),
            },
        );
        if let Some(previous) = previous {
            debug!(
                "Replaced cached sizes for {} computed at {}",
                package,
                previous.computed_at.to_rfc3339()
            );
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
