//! Lookup tables that steer listing and summarization
//!
//! Everything the generator treats as a naming convention lives here as data:
//! which names are hidden, which top-level directories are not mirror content,
//! how checksum artifacts are named, how buckets are described, and what the
//! generator's own output files are called. [`Conventions::default`] carries
//! the reference tables; a JSON file can override any of them.
//!
//! ```rust
//! use mirrorgen::conventions::Conventions;
//!
//! let conventions: Conventions = serde_json::from_str(
//!     r#"{ "reserved_roots": ["ui", "out", "node_modules", "staging"] }"#,
//! ).unwrap();
//! assert!(conventions.reserved_roots.contains("staging"));
//! assert_eq!(conventions.listing_file, "dir.json");
//! ```

use crate::error::{MirrorError, Result};
use crate::utils::TEMP_PREFIX;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// How a mirrored project publishes checksums
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChecksumConvention {
    /// Per-file sidecar named `<file><suffix>`
    Sidecar { suffix: String },
    /// One checksum file covering the whole directory
    Directory { file_name: String },
}

/// Immutable naming tables injected into the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conventions {
    /// Names starting with this character are hidden
    pub hidden_prefix: char,
    /// Names hidden regardless of prefix
    pub hidden_names: BTreeSet<String>,
    /// Top-level directories that are never buckets
    pub reserved_roots: BTreeSet<String>,
    /// Listing file written into every directory
    pub listing_file: String,
    /// Manifest file written at the root
    pub manifest_file: String,
    /// Auxiliary summary document
    pub tldr_file: String,
    /// Auxiliary readme document
    pub readme_file: String,
    /// Checksum lookups, first match wins
    pub checksum_conventions: Vec<ChecksumConvention>,
    /// Fold `<file><suffix>` sidecars into their owner's item
    pub fold_sidecars: bool,
    /// Bucket name to human summary
    pub summary_overrides: BTreeMap<String, String>,
    /// Extra glob patterns excluded from listings (matched against names)
    pub exclude_patterns: Vec<String>,
}

impl Default for Conventions {
    fn default() -> Self {
        let summaries = [
            ("offline-package", "Offline installers & air-gapped bundles"),
            ("xray-core", "Xray-core releases"),
            ("xstream", "XStream app releases (multi-platform)"),
            ("otel", "OpenTelemetry collectors & tools"),
            ("deb", "Debian packages"),
            ("rpm", "RPM packages"),
        ];

        Self {
            hidden_prefix: '.',
            hidden_names: [".git", ".github", ".DS_Store"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            reserved_roots: ["out", "ui", "node_modules"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            listing_file: "dir.json".to_string(),
            manifest_file: "manifest.json".to_string(),
            tldr_file: "tldr.md".to_string(),
            readme_file: "README.md".to_string(),
            checksum_conventions: vec![
                ChecksumConvention::Sidecar { suffix: ".sha256sum".to_string() },
                ChecksumConvention::Directory { file_name: "SHA256SUMS".to_string() },
                ChecksumConvention::Directory { file_name: "sha256sum.txt".to_string() },
            ],
            fold_sidecars: true,
            summary_overrides: summaries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl Conventions {
    /// Load conventions from a JSON file
    ///
    /// Missing keys keep their defaults. A key that is present replaces the
    /// whole default table, so a `summary_overrides` object drops every
    /// built-in summary it does not repeat.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MirrorError::configuration(format!("{}: {}", path.display(), e))
        })?;
        let conventions: Conventions = serde_json::from_str(&raw).map_err(|e| {
            MirrorError::configuration(format!("{}: {}", path.display(), e))
        })?;
        conventions.validate()?;
        Ok(conventions)
    }

    /// Reject tables the generator cannot work with
    pub fn validate(&self) -> Result<()> {
        for (label, name) in [
            ("listing_file", &self.listing_file),
            ("manifest_file", &self.manifest_file),
        ] {
            if !is_plain_name(name) {
                return Err(MirrorError::configuration(format!(
                    "{} must be a plain file name, got {:?}",
                    label, name
                )));
            }
        }
        if self.listing_file == self.manifest_file {
            return Err(MirrorError::configuration(
                "listing_file and manifest_file must differ",
            ));
        }
        for convention in &self.checksum_conventions {
            match convention {
                ChecksumConvention::Sidecar { suffix } if suffix.is_empty() => {
                    return Err(MirrorError::configuration("sidecar suffix must not be empty"));
                }
                ChecksumConvention::Directory { file_name } if !is_plain_name(file_name) => {
                    return Err(MirrorError::configuration(format!(
                        "checksum file must be a plain file name, got {:?}",
                        file_name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Human summary for a bucket
    pub fn summary_for(&self, bucket: &str) -> String {
        self.summary_overrides
            .get(bucket)
            .cloned()
            .unwrap_or_else(|| format!("{} artifacts", bucket))
    }

    /// Sidecar suffixes in lookup order
    pub fn sidecar_suffixes(&self) -> impl Iterator<Item = &str> {
        self.checksum_conventions.iter().filter_map(|c| match c {
            ChecksumConvention::Sidecar { suffix } => Some(suffix.as_str()),
            ChecksumConvention::Directory { .. } => None,
        })
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Compiled visibility rules derived from [`Conventions`]
#[derive(Debug, Clone)]
pub struct EntryFilter {
    hidden_prefix: char,
    hidden_names: BTreeSet<String>,
    generated: [String; 2],
    excludes: GlobSet,
}

impl EntryFilter {
    /// Compile the filter
    ///
    /// # Errors
    ///
    /// - [`MirrorError::InvalidPattern`] if an exclude pattern is not a valid glob
    pub fn new(conventions: &Conventions) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &conventions.exclude_patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| MirrorError::InvalidPattern(format!("{}: {}", pattern, e)))?;
            builder.add(glob);
        }
        let excludes = builder
            .build()
            .map_err(|e| MirrorError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            hidden_prefix: conventions.hidden_prefix,
            hidden_names: conventions.hidden_names.clone(),
            generated: [
                conventions.listing_file.clone(),
                conventions.manifest_file.clone(),
            ],
            excludes,
        })
    }

    /// Hidden by prefix or by name
    pub fn is_hidden(&self, name: &str) -> bool {
        name.starts_with(self.hidden_prefix) || self.hidden_names.contains(name)
    }

    /// One of the generator's own output files
    pub fn is_generated(&self, name: &str) -> bool {
        self.generated.iter().any(|g| g == name)
    }

    /// Matched by an extra exclude pattern
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excludes.is_match(name)
    }

    /// A record write still in flight
    pub fn is_temporary(&self, name: &str) -> bool {
        name.starts_with(TEMP_PREFIX)
    }

    /// Whether an entry belongs in listings, counts and recency
    pub fn is_visible(&self, name: &str) -> bool {
        !self.is_hidden(name)
            && !self.is_generated(name)
            && !self.is_temporary(name)
            && !self.is_excluded(name)
    }
}
