//! Map types for in-memory caches keyed by path
//!
//! The `gxhash` feature swaps in a faster hasher for the per-run recency
//! cache. It needs AES-NI and SSE2, so it stays opt-in.

use std::path::PathBuf;

#[cfg(feature = "gxhash")]
use gxhash::HashMapExt;

/// Map keyed by absolute filesystem path
#[cfg(feature = "gxhash")]
pub type PathMap<V> = gxhash::HashMap<PathBuf, V>;

/// Map keyed by absolute filesystem path
#[cfg(not(feature = "gxhash"))]
pub type PathMap<V> = std::collections::HashMap<PathBuf, V>;

/// Empty [`PathMap`] with room for `capacity` entries
pub fn path_map<V>(capacity: usize) -> PathMap<V> {
    PathMap::with_capacity(capacity)
}
