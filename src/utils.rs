//! Utility functions for mirrorgen
//!
//! This module holds the persistence primitives and timestamp helpers shared
//! by the rest of the crate.
//!
//! ## Atomic Writes
//!
//! Every record goes through [`write_record`]. Content is serialized up front,
//! compared with what is already on disk, and only when it differs written to
//! a temporary sibling that is renamed over the destination. A reader sees
//! either the old file or the new one, never a truncated file.
//!
//! The temporary file is a [`tempfile::NamedTempFile`], so it is removed on
//! every failure path when it drops. Its name starts with [`TEMP_PREFIX`],
//! which the listing rules never show whatever the hidden prefix is. On unix
//! it gets [`RECORD_MODE`] before the rename.
//!
//! ## Timestamps
//!
//! Records carry second-precision UTC timestamps rendered as
//! `YYYY-MM-DDTHH:MM:SSZ`. [`to_timestamp`] truncates sub-second precision at
//! the source so in-memory and on-disk values agree.

use crate::error::{MirrorError, Result};
use chrono::{DateTime, SubsecRound, Utc};
use filetime::FileTime;
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::SystemTime;
use tempfile::Builder;
use tracing::{trace, warn};

use crate::types::WriteOutcome;

/// Name prefix of in-flight temporary record files
pub const TEMP_PREFIX: &str = ".tmp";

/// Permission bits of persisted records (world-readable)
#[cfg(unix)]
pub const RECORD_MODE: u32 = 0o644;

/// Timestamp format used by every record
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Convert a filesystem time to a second-precision UTC timestamp
pub fn to_timestamp(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time).trunc_subsecs(0)
}

/// Modification time of `metadata` as a record timestamp
pub fn modified_at(metadata: &fs::Metadata) -> std::io::Result<DateTime<Utc>> {
    metadata.modified().map(to_timestamp)
}

/// Render a timestamp the way records store it
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Serde adapter for record timestamps
pub mod iso8601 {
    use super::format_timestamp;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Serialize a record exactly as it is persisted
///
/// Pretty JSON with two-space indentation and a trailing newline. Non-ASCII
/// names are written as UTF-8, not escaped.
pub fn serialize_record<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(record)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Atomic file write (write to temp file then rename)
///
/// The temporary file lives next to `path` so the rename never crosses a
/// filesystem boundary. If any step fails the temporary file is removed when
/// it drops.
///
/// # Errors
///
/// - [`MirrorError::Persist`] if the temporary file cannot be created or
///   written, or the rename fails
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| MirrorError::internal(format!("{:?} has no parent directory", path)))?;

    let mut temp = Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(parent)
        .map_err(|e| MirrorError::persist(path, e))?;

    // Temp files start out owner-only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(RECORD_MODE))
            .map_err(|e| MirrorError::persist(path, e))?;
    }

    temp.write_all(content)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| MirrorError::persist(path, e))?;

    temp.persist(path)
        .map_err(|e| MirrorError::persist(path, e.error))?;

    Ok(())
}

/// Persist a record idempotently
///
/// Skips the write when `path` already holds the same bytes. Otherwise writes
/// atomically and then puts the parent directory's modification time back to
/// its pre-write value, so generated files never make a directory look fresher
/// than its content.
pub fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<WriteOutcome> {
    let content = serialize_record(record)?;

    match fs::read(path) {
        Ok(existing) if existing == content => {
            trace!("Unchanged: {:?}", path);
            return Ok(WriteOutcome::Unchanged);
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Could not read existing {:?}, rewriting: {}", path, e),
    }

    let parent = path.parent();
    let parent_mtime = parent
        .and_then(|dir| fs::metadata(dir).ok())
        .map(|meta| FileTime::from_last_modification_time(&meta));

    atomic_write(path, &content)?;

    if let (Some(dir), Some(mtime)) = (parent, parent_mtime) {
        if let Err(e) = filetime::set_file_mtime(dir, mtime) {
            warn!("Could not restore modification time of {:?}: {}", dir, e);
        }
    }

    trace!("Wrote {:?} ({} bytes)", path, content.len());
    Ok(WriteOutcome::Written)
}
