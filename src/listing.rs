//! Per-directory listing records
//!
//! [`DirectoryRecordBuilder`] turns one directory into a [`DirectoryRecord`]:
//! its URL, its recursive recency, and its visible children in display order
//! (directories first, then files, each group sorted by name). The front-end
//! relies on that order, so it is part of the record contract.
//!
//! Building is read-only. Persisting the record is the generator's job.

use crate::checksum::ChecksumResolver;
use crate::conventions::{Conventions, EntryFilter};
use crate::error::Result;
use crate::recency::RecencyAggregator;
use crate::types::{DirectoryRecord, ItemRecord};
use crate::url::UrlMapper;
use crate::utils::modified_at;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// A visible child of a directory
#[derive(Debug)]
pub struct Child {
    /// File name as displayed
    pub name: String,
    /// Full path
    pub path: PathBuf,
    /// Directory (symlinks follow their target)
    pub is_dir: bool,
    /// Metadata, following symlinks
    pub metadata: fs::Metadata,
}

/// List the visible children of `dir` in display order
///
/// Hidden entries, generated files and excluded names are dropped, as are
/// entries that vanish before they can be stat'ed and anything that is
/// neither a file nor a directory. With `fold_sidecars` set, per-file
/// checksum sidecars whose owner is listed are dropped too; they surface as
/// the owner's checksum reference instead.
///
/// # Errors
///
/// Fails when `dir` itself cannot be read.
pub fn visible_children(
    dir: &Path,
    filter: &EntryFilter,
    conventions: &Conventions,
) -> Result<Vec<Child>> {
    let mut children = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry in {:?}: {}", dir, e);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if !filter.is_visible(&name) {
            continue;
        }

        let path = entry.path();
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                trace!("Skipping {:?}: {}", path, e);
                continue;
            }
        };
        if !metadata.is_dir() && !metadata.is_file() {
            continue;
        }

        children.push(Child {
            name,
            is_dir: metadata.is_dir(),
            path,
            metadata,
        });
    }

    if conventions.fold_sidecars {
        fold_sidecars(&mut children, conventions);
    }

    children.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(children)
}

fn fold_sidecars(children: &mut Vec<Child>, conventions: &Conventions) {
    let files: BTreeSet<String> = children
        .iter()
        .filter(|c| !c.is_dir)
        .map(|c| c.name.clone())
        .collect();

    children.retain(|child| {
        if child.is_dir {
            return true;
        }
        !conventions.sidecar_suffixes().any(|suffix| {
            child
                .name
                .strip_suffix(suffix)
                .is_some_and(|owner| !owner.is_empty() && files.contains(owner))
        })
    });
}

/// Builds listing records for single directories
#[derive(Debug)]
pub struct DirectoryRecordBuilder<'a> {
    mapper: &'a UrlMapper,
    resolver: &'a ChecksumResolver,
    filter: &'a EntryFilter,
    conventions: &'a Conventions,
}

impl<'a> DirectoryRecordBuilder<'a> {
    pub fn new(
        mapper: &'a UrlMapper,
        resolver: &'a ChecksumResolver,
        filter: &'a EntryFilter,
        conventions: &'a Conventions,
    ) -> Self {
        Self {
            mapper,
            resolver,
            filter,
            conventions,
        }
    }

    /// Build the listing record for `dir`
    ///
    /// Children that vanish mid-scan are left out of the record.
    ///
    /// # Errors
    ///
    /// Fails when `dir` itself cannot be read or stat'ed.
    pub fn build(&self, dir: &Path, recency: &mut RecencyAggregator<'_>) -> Result<DirectoryRecord> {
        let children = visible_children(dir, self.filter, self.conventions)?;
        let mut items = Vec::with_capacity(children.len());

        for child in children {
            if child.is_dir {
                match recency.entry(&child.path) {
                    Ok(updated_at) => items.push(ItemRecord::directory(
                        &child.name,
                        self.mapper.dir_href(&child.path),
                        updated_at,
                    )),
                    Err(e) => trace!("Dropping {:?}: {}", child.path, e),
                }
            } else {
                let updated_at = match modified_at(&child.metadata) {
                    Ok(ts) => ts,
                    Err(e) => {
                        trace!("Dropping {:?}: {}", child.path, e);
                        continue;
                    }
                };
                let checksum_ref = self.resolver.resolve(dir, &child.path, self.mapper);
                items.push(ItemRecord::file(
                    child.name,
                    self.mapper.file_href(&child.path),
                    updated_at,
                    child.metadata.len(),
                    checksum_ref,
                ));
            }
        }

        Ok(DirectoryRecord {
            path: self.mapper.dir_href(dir),
            updated_at: recency.directory(dir)?,
            items,
            tldr_ref: self.document_ref(dir, &self.conventions.tldr_file),
            readme_ref: self.document_ref(dir, &self.conventions.readme_file),
        })
    }

    fn document_ref(&self, dir: &Path, name: &str) -> Option<String> {
        let path = dir.join(name);
        path.is_file().then(|| self.mapper.file_href(&path))
    }
}
