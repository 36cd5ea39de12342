//! Filesystem path to URL path mapping
//!
//! Maps `root/a/b` to `<prefix>/a/b`, with a trailing `/` for directories and
//! `/` separators on every platform. The mapper is purely lexical and never
//! touches the filesystem; callers say whether the target is a directory.

use std::path::{Component, Path, PathBuf};

/// Maps paths under the mirror root to canonical URL paths
#[derive(Debug, Clone)]
pub struct UrlMapper {
    root: PathBuf,
    prefix: String,
}

impl UrlMapper {
    /// Create a mapper for `root` with the given URL prefix
    ///
    /// Trailing slashes are stripped from the prefix and a leading slash is
    /// added when missing, so `""`, `"/"` and `"///"` all mean "no prefix"
    /// and `"dl/"` becomes `"/dl"`.
    pub fn new(root: impl Into<PathBuf>, prefix: &str) -> Self {
        let trimmed = prefix.trim_end_matches('/');
        let prefix = if trimmed.is_empty() || trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };

        Self {
            root: root.into(),
            prefix,
        }
    }

    /// Mirror root this mapper is anchored at
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalized prefix (empty when none)
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// URL path for `path`
    ///
    /// `path` must lie under the root. The root itself maps to `<prefix>/`.
    pub fn href(&self, path: &Path, is_dir: bool) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or_else(|_| {
            debug_assert!(false, "{:?} is outside mirror root {:?}", path, self.root);
            path
        });

        let mut url = self.prefix.clone();
        for component in relative.components() {
            if let Component::Normal(segment) = component {
                url.push('/');
                url.push_str(&segment.to_string_lossy());
            }
        }
        if is_dir || url.is_empty() {
            url.push('/');
        }
        url
    }

    /// URL path for a directory
    pub fn dir_href(&self, path: &Path) -> String {
        self.href(path, true)
    }

    /// URL path for a file
    pub fn file_href(&self, path: &Path) -> String {
        self.href(path, false)
    }
}
