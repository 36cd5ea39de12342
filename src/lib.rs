//! # mirrorgen - Listings and manifests for static file mirrors
//!
//! mirrorgen scans the directory tree behind a static download portal and
//! writes a metadata layer next to the files, so a front-end can render
//! browsable listings without any server-side logic:
//!
//! - one `dir.json` listing per directory, with per-item size, freshness and
//!   checksum links
//! - one `manifest.json` at the root summarizing the mirror's top-level buckets
//!
//! Every run is a full, synchronous rescan. Records are disposable caches of
//! the filesystem and are rewritten atomically, so a reader never observes a
//! half-written file, and a rerun over an unchanged tree leaves every listing
//! byte-for-byte identical.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mirrorgen::GeneratorBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stats = GeneratorBuilder::new()
//!     .base_url_prefix("/")
//!     .build("/data/update-server")?
//!     .run()?;
//!
//! println!("Wrote {} listings", stats.listings_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Record Layout
//!
//! ```text
//! dir.json       { path, updated_at, items[ {name, size?, updated_at, href, dir?, sha256?} ], tldr?, readme? }
//! manifest.json  { generated_at, roots[ {name, href, updated_at, item_count, summary} ] }
//! ```
//!
//! Hrefs are URL paths starting with `/` (plus the configured prefix);
//! directory hrefs end with `/`. Timestamps are UTC with second precision.
//!
//! ## Checksums
//!
//! A file's `sha256` points at the first existing artifact among a sibling
//! `<file>.sha256sum`, a directory-level `SHA256SUMS`, and `sha256sum.txt`.
//! The lookup order is configurable through [`Conventions`].
//!
//! ## Module Organization
//!
//! - [`generator`]: the tree walk and the [`GeneratorBuilder`]
//! - [`listing`]: per-directory records
//! - [`summary`]: the root manifest
//! - [`checksum`]: checksum artifact discovery
//! - [`recency`]: recursive freshness
//! - [`url`]: path to URL mapping
//! - [`conventions`]: naming tables and visibility rules
//! - [`types`]: persisted record types
//! - [`error`]: error types and handling

// Public API modules
pub mod checksum;
pub mod conventions;
pub mod error;
pub mod generator;
pub mod listing;
pub mod recency;
pub mod summary;
pub mod types;
pub mod url;
pub mod utils;

// Internal modules (not part of public API)
mod collections;

// Re-export main types for convenience
pub use conventions::{ChecksumConvention, Conventions, EntryFilter};
pub use error::{MirrorError, Result};
pub use generator::{Generator, GeneratorBuilder};
pub use types::*;
pub use url::UrlMapper;
