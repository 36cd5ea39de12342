//! Record types persisted by the generator
//!
//! Field order in these structs is the serialized key order. The front-end
//! consumes the keys directly, so renames here are wire changes.
//!
//! ## Examples
//!
//! ```rust
//! use mirrorgen::types::ItemRecord;
//! use chrono::{TimeZone, Utc};
//!
//! let item = ItemRecord::file(
//!     "setup.bin".to_string(),
//!     "/offline-package/setup.bin".to_string(),
//!     Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
//!     10,
//!     Some("/offline-package/setup.bin.sha256sum".to_string()),
//! );
//! let json = serde_json::to_string(&item).unwrap();
//! assert!(json.contains("\"sha256\":\"/offline-package/setup.bin.sha256sum\""));
//! assert!(!json.contains("\"dir\""));
//! ```

use crate::utils::iso8601;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn is_false(value: &bool) -> bool {
    !*value
}

/// One child of a directory listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemRecord {
    /// Display name; directories end with `/`
    pub name: String,
    /// Size in bytes (files only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Recency of the entry
    #[serde(with = "iso8601")]
    pub updated_at: DateTime<Utc>,
    /// Canonical URL path
    pub href: String,
    /// Whether the entry is a directory
    #[serde(rename = "dir", default, skip_serializing_if = "is_false")]
    pub is_directory: bool,
    /// URL path of the checksum artifact covering this file
    #[serde(rename = "sha256", default, skip_serializing_if = "Option::is_none")]
    pub checksum_ref: Option<String>,
}

impl ItemRecord {
    /// Item for a subdirectory
    pub fn directory(name: &str, href: String, updated_at: DateTime<Utc>) -> Self {
        Self {
            name: format!("{}/", name),
            size: None,
            updated_at,
            href,
            is_directory: true,
            checksum_ref: None,
        }
    }

    /// Item for a regular file
    pub fn file(
        name: String,
        href: String,
        updated_at: DateTime<Utc>,
        size: u64,
        checksum_ref: Option<String>,
    ) -> Self {
        Self {
            name,
            size: Some(size),
            updated_at,
            href,
            is_directory: false,
            checksum_ref,
        }
    }
}

/// Listing record written to every directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// Canonical URL path of the directory, with trailing `/`
    pub path: String,
    /// Recency over everything beneath the directory
    #[serde(with = "iso8601")]
    pub updated_at: DateTime<Utc>,
    /// Children in display order
    pub items: Vec<ItemRecord>,
    /// URL of `tldr.md` when present
    #[serde(rename = "tldr", default, skip_serializing_if = "Option::is_none")]
    pub tldr_ref: Option<String>,
    /// URL of `README.md` when present
    #[serde(rename = "readme", default, skip_serializing_if = "Option::is_none")]
    pub readme_ref: Option<String>,
}

/// Summary of one top-level bucket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketSummary {
    pub name: String,
    pub href: String,
    #[serde(with = "iso8601")]
    pub updated_at: DateTime<Utc>,
    /// Immediate visible children, one level only
    pub item_count: usize,
    pub summary: String,
}

/// Root manifest written once per run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootManifest {
    #[serde(with = "iso8601")]
    pub generated_at: DateTime<Utc>,
    /// Buckets sorted by name
    pub roots: Vec<BucketSummary>,
}

/// Result of persisting one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// New content was written and renamed into place
    Written,
    /// Destination already held identical bytes
    Unchanged,
}

/// Progress event emitted for every persisted record
#[derive(Debug, Clone)]
pub struct PersistEvent {
    /// Destination file
    pub path: PathBuf,
    /// What the writer did
    pub outcome: WriteOutcome,
}

/// Statistics for a full generator run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateStats {
    /// Listing files rewritten with new content
    pub listings_written: usize,
    /// Listing files whose content was already current
    pub listings_unchanged: usize,
    /// Directories omitted because they vanished or could not be read
    pub directories_skipped: usize,
    /// Buckets in the root manifest
    pub buckets: usize,
    /// Whether the manifest file was rewritten
    pub manifest_written: bool,
    /// Wall time of the run
    pub duration: Duration,
}

impl GenerateStats {
    /// Total listing records persisted or confirmed current
    pub fn listings(&self) -> usize {
        self.listings_written + self.listings_unchanged
    }

    pub(crate) fn record_listing(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Written => self.listings_written += 1,
            WriteOutcome::Unchanged => self.listings_unchanged += 1,
        }
    }
}
