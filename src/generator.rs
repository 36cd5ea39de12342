//! Full-tree generation runs
//!
//! [`Generator`] walks the mirror top-down in name order. Every directory's
//! listing is built and persisted as soon as it is visited; records are
//! independent of each other, so nothing waits for descendants. Once the walk
//! finishes, the root manifest is built and persisted.
//!
//! Hidden and excluded directories are pruned together with their whole
//! subtree, and symlinked directories are listed by their parent but never
//! descended. A directory that vanishes or cannot be read is skipped and the
//! walk goes on; a failed write ends the run.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mirrorgen::GeneratorBuilder;
//!
//! # fn main() -> mirrorgen::Result<()> {
//! let generator = GeneratorBuilder::new()
//!     .base_url_prefix("/dl")
//!     .build("/data/update-server")?;
//!
//! let stats = generator.run()?;
//! println!("{} listings, {} buckets", stats.listings(), stats.buckets);
//! # Ok(())
//! # }
//! ```

use crate::checksum::ChecksumResolver;
use crate::conventions::{Conventions, EntryFilter};
use crate::error::{MirrorError, Result};
use crate::listing::DirectoryRecordBuilder;
use crate::recency::RecencyAggregator;
use crate::summary::RootSummarizer;
use crate::types::{GenerateStats, PersistEvent, WriteOutcome};
use crate::url::UrlMapper;
use crate::utils::{to_timestamp, write_record};
use chrono::{DateTime, SubsecRound, Utc};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Generates listing records and the root manifest for one mirror root
#[derive(Debug)]
pub struct Generator {
    root: PathBuf,
    mapper: UrlMapper,
    conventions: Conventions,
    filter: EntryFilter,
    resolver: ChecksumResolver,
    generated_at: Option<DateTime<Utc>>,
}

impl Generator {
    /// Canonical mirror root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Conventions in effect
    pub fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    /// Run a full generation pass
    pub fn run(&self) -> Result<GenerateStats> {
        self.run_with_progress::<fn(&PersistEvent)>(None)
    }

    /// Run a full generation pass, reporting every persisted record
    ///
    /// # Errors
    ///
    /// - [`MirrorError::Persist`] if any record cannot be written
    /// - [`MirrorError::Io`] if the root itself can no longer be listed
    pub fn run_with_progress<F>(&self, mut progress: Option<F>) -> Result<GenerateStats>
    where
        F: FnMut(&PersistEvent),
    {
        let start = Instant::now();
        let mut stats = GenerateStats::default();
        let mut recency = RecencyAggregator::new(&self.filter);
        let builder = DirectoryRecordBuilder::new(
            &self.mapper,
            &self.resolver,
            &self.filter,
            &self.conventions,
        );

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || self.filter.is_visible(&entry.file_name().to_string_lossy())
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // The directory itself is counted when its listing fails to build
                Err(e) => {
                    let err = MirrorError::from(e);
                    if err.is_vanished() {
                        debug!("Skipping vanished entry: {}", err);
                    } else {
                        warn!("Skipping unreadable entry: {}", err);
                    }
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            let dir = entry.path();
            let record = match builder.build(dir, &mut recency) {
                Ok(record) => record,
                Err(e) if e.is_vanished() => {
                    debug!("Directory vanished during scan: {:?}", dir);
                    stats.directories_skipped += 1;
                    continue;
                }
                Err(e) if matches!(e, MirrorError::Io(_)) => {
                    warn!("Skipping directory {:?}: {}", dir, e);
                    stats.directories_skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let target = dir.join(&self.conventions.listing_file);
            let outcome = write_record(&target, &record)?;
            debug!("{:?} {:?} ({} items)", outcome, target, record.items.len());
            stats.record_listing(outcome);
            if let Some(callback) = progress.as_mut() {
                callback(&PersistEvent { path: target, outcome });
            }
        }

        let summarizer = RootSummarizer::new(&self.mapper, &self.filter, &self.conventions);
        let generated_at = self
            .generated_at
            .unwrap_or_else(|| to_timestamp(SystemTime::now()));
        let manifest = summarizer.summarize(&self.root, &mut recency, generated_at)?;
        stats.buckets = manifest.roots.len();

        let target = self.root.join(&self.conventions.manifest_file);
        let outcome = write_record(&target, &manifest)?;
        stats.manifest_written = outcome == WriteOutcome::Written;
        if let Some(callback) = progress.as_mut() {
            callback(&PersistEvent { path: target, outcome });
        }

        stats.duration = start.elapsed();
        info!(
            "Generated {} listings ({} unchanged, {} skipped) and {} buckets in {:?}",
            stats.listings(),
            stats.listings_unchanged,
            stats.directories_skipped,
            stats.buckets,
            stats.duration
        );
        Ok(stats)
    }
}

/// Builder for configuring a [`Generator`]
#[derive(Debug, Clone)]
pub struct GeneratorBuilder {
    base_url_prefix: String,
    conventions: Conventions,
    generated_at: Option<DateTime<Utc>>,
}

impl GeneratorBuilder {
    /// Create a builder with the reference conventions and prefix `/`
    pub fn new() -> Self {
        Self {
            base_url_prefix: "/".to_string(),
            conventions: Conventions::default(),
            generated_at: None,
        }
    }

    /// URL prefix prepended to every href
    pub fn base_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.base_url_prefix = prefix.into();
        self
    }

    /// Replace the naming conventions
    pub fn conventions(mut self, conventions: Conventions) -> Self {
        self.conventions = conventions;
        self
    }

    /// Pin the manifest's `generated_at` instead of using the current time
    pub fn generated_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.generated_at = Some(timestamp);
        self
    }

    /// Validate configuration and build the generator for `root`
    ///
    /// # Errors
    ///
    /// - [`MirrorError::RootNotFound`] if `root` does not exist
    /// - [`MirrorError::RootNotDirectory`] if `root` is not a directory
    /// - [`MirrorError::InvalidConfiguration`] for unusable conventions
    /// - [`MirrorError::InvalidPattern`] for bad exclude patterns
    pub fn build(self, root: impl AsRef<Path>) -> Result<Generator> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|_| MirrorError::RootNotFound(root.to_path_buf()))?;
        if !root.is_dir() {
            return Err(MirrorError::RootNotDirectory(root));
        }

        self.conventions.validate()?;
        let filter = EntryFilter::new(&self.conventions)?;
        let resolver = ChecksumResolver::new(self.conventions.checksum_conventions.clone());
        let mapper = UrlMapper::new(&root, &self.base_url_prefix);

        Ok(Generator {
            root,
            mapper,
            conventions: self.conventions,
            filter,
            resolver,
            generated_at: self.generated_at.map(|ts| ts.trunc_subsecs(0)),
        })
    }
}

impl Default for GeneratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
