//! Checksum artifact discovery
//!
//! Mirrored projects publish checksums inconsistently: some ship a sidecar per
//! file, others one file per directory. The resolver tries each configured
//! [`ChecksumConvention`] in order and returns the URL of the first artifact
//! that exists. It only references artifacts; nothing is hashed or verified.

use crate::conventions::ChecksumConvention;
use crate::url::UrlMapper;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Resolves checksum references for files in a directory
#[derive(Debug, Clone)]
pub struct ChecksumResolver {
    conventions: Vec<ChecksumConvention>,
}

impl ChecksumResolver {
    /// Create a resolver that tries `conventions` in order
    pub fn new(conventions: Vec<ChecksumConvention>) -> Self {
        Self { conventions }
    }

    /// Path of the first existing checksum artifact for `file`
    pub fn locate(&self, dir: &Path, file: &Path) -> Option<PathBuf> {
        self.conventions.iter().find_map(|convention| {
            let candidate = match convention {
                ChecksumConvention::Sidecar { suffix } => {
                    let mut name = file.file_name()?.to_os_string();
                    name.push(suffix);
                    dir.join(name)
                }
                ChecksumConvention::Directory { file_name } => dir.join(file_name),
            };
            candidate.is_file().then_some(candidate)
        })
    }

    /// URL of the checksum artifact covering `file`, if any
    pub fn resolve(&self, dir: &Path, file: &Path, mapper: &UrlMapper) -> Option<String> {
        let artifact = self.locate(dir, file)?;
        trace!("Checksum for {:?}: {:?}", file, artifact);
        Some(mapper.file_href(&artifact))
    }
}
