//! Freshness timestamps for files and directory trees
//!
//! A file's recency is its own modification time. A directory's recency is
//! the newest of its own modification time and the recency of every visible
//! entry beneath it, subdirectories included, so a directory is never older
//! than anything it contains.
//!
//! Directory results are memoized for the lifetime of the aggregator. The
//! generator keeps one aggregator per run, which makes the whole walk scan
//! each subtree once instead of once per ancestor.
//!
//! Entries that vanish while being inspected are skipped. Freshness is best
//! effort and never fails a run on its own.

use crate::collections::{path_map, PathMap};
use crate::conventions::EntryFilter;
use crate::error::Result;
use crate::utils::modified_at;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// Memoizing recency calculator
#[derive(Debug)]
pub struct RecencyAggregator<'a> {
    filter: &'a EntryFilter,
    cache: PathMap<DateTime<Utc>>,
}

impl<'a> RecencyAggregator<'a> {
    /// Create an aggregator that ignores entries `filter` hides
    pub fn new(filter: &'a EntryFilter) -> Self {
        Self {
            filter,
            cache: path_map(64),
        }
    }

    /// Recency of a single file (symlinks report their target)
    pub fn file(&self, path: &Path) -> Result<DateTime<Utc>> {
        Ok(modified_at(&fs::metadata(path)?)?)
    }

    /// Recursive recency of a directory
    ///
    /// # Errors
    ///
    /// Fails only when `path` itself cannot be stat'ed. Descendants that
    /// disappear or cannot be read are skipped.
    pub fn directory(&mut self, path: &Path) -> Result<DateTime<Utc>> {
        if let Some(cached) = self.cache.get(path) {
            return Ok(*cached);
        }

        let mut latest = modified_at(&fs::metadata(path)?)?;

        match fs::read_dir(path) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let name = entry.file_name();
                    if !self.filter.is_visible(&name.to_string_lossy()) {
                        continue;
                    }
                    if let Some(ts) = self.entry_recency(&entry.path()) {
                        latest = latest.max(ts);
                    }
                }
            }
            Err(e) => debug!("Cannot list {:?} for recency: {}", path, e),
        }

        trace!("Recency of {:?}: {}", path, latest);
        self.cache.insert(path.to_path_buf(), latest);
        Ok(latest)
    }

    /// Recency of any entry; directories are descended unless they are symlinks
    pub fn entry(&mut self, path: &Path) -> Result<DateTime<Utc>> {
        let meta = fs::symlink_metadata(path)?;
        if meta.is_dir() {
            self.directory(path)
        } else if meta.file_type().is_symlink() {
            self.file(path)
        } else {
            Ok(modified_at(&meta)?)
        }
    }

    fn entry_recency(&mut self, path: &Path) -> Option<DateTime<Utc>> {
        match self.entry(path) {
            Ok(ts) => Some(ts),
            Err(e) => {
                trace!("Skipping {:?} for recency: {}", path, e);
                None
            }
        }
    }

    /// Number of memoized directories
    pub fn cached_directories(&self) -> usize {
        self.cache.len()
    }
}
