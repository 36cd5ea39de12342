//! Root manifest construction
//!
//! Top-level directories of the mirror are its buckets. Hidden directories
//! and reserved names (build output, UI sources, tooling) are not mirror
//! content and never appear in the manifest.

use crate::conventions::{Conventions, EntryFilter};
use crate::error::Result;
use crate::listing::visible_children;
use crate::recency::RecencyAggregator;
use crate::types::{BucketSummary, RootManifest};
use crate::url::UrlMapper;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Builds the root manifest
#[derive(Debug)]
pub struct RootSummarizer<'a> {
    mapper: &'a UrlMapper,
    filter: &'a EntryFilter,
    conventions: &'a Conventions,
}

impl<'a> RootSummarizer<'a> {
    pub fn new(mapper: &'a UrlMapper, filter: &'a EntryFilter, conventions: &'a Conventions) -> Self {
        Self {
            mapper,
            filter,
            conventions,
        }
    }

    /// Top-level bucket directories of `root`, sorted by name
    pub fn buckets(&self, root: &Path) -> Result<Vec<(String, PathBuf)>> {
        let mut buckets = Vec::new();
        for entry in fs::read_dir(root)?.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !self.filter.is_visible(&name) || self.conventions.reserved_roots.contains(&name) {
                continue;
            }
            let path = entry.path();
            if fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false) {
                buckets.push((name, path));
            }
        }
        buckets.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(buckets)
    }

    /// Immediate visible children of a bucket, one level deep
    pub fn item_count(&self, dir: &Path) -> usize {
        match visible_children(dir, self.filter, self.conventions) {
            Ok(children) => children.len(),
            Err(e) => {
                debug!("Cannot count items in {:?}: {}", dir, e);
                0
            }
        }
    }

    /// Build the manifest for `root`, stamped with `generated_at`
    ///
    /// Buckets that vanish before their recency can be read are left out.
    /// Symlinked buckets are not descended and report their target's own
    /// modification time, as in the root listing.
    pub fn summarize(
        &self,
        root: &Path,
        recency: &mut RecencyAggregator<'_>,
        generated_at: DateTime<Utc>,
    ) -> Result<RootManifest> {
        let mut roots = Vec::new();

        for (name, path) in self.buckets(root)? {
            let updated_at = match recency.entry(&path) {
                Ok(ts) => ts,
                Err(e) => {
                    trace!("Dropping bucket {}: {}", name, e);
                    continue;
                }
            };
            roots.push(BucketSummary {
                href: self.mapper.dir_href(&path),
                updated_at,
                item_count: self.item_count(&path),
                summary: self.conventions.summary_for(&name),
                name,
            });
        }

        Ok(RootManifest { generated_at, roots })
    }
}
