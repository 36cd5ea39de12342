//! Integration tests for mirrorgen
//!
//! End-to-end runs over realistic mirror layouts: record contents, rerun
//! behaviour, and the freshness guarantees the front-end relies on.

use ::mirrorgen::*;
use chrono::{TimeZone, Utc};
use filetime::FileTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// A temporary mirror with helpers for building layouts
pub struct MirrorHarness {
    pub temp_dir: TempDir,
}

impl MirrorHarness {
    pub fn new() -> Self {
        Self {
            temp_dir: tempfile::Builder::new().prefix("mirrorgen-test").tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` at `rel`, creating parents
    pub fn file(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn dir(&self, rel: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Set the mtime of `rel` to `secs` after the epoch
    pub fn touch(&self, rel: &str, secs: i64) {
        filetime::set_file_mtime(self.root().join(rel), FileTime::from_unix_time(secs, 0)).unwrap();
    }

    pub fn generator(&self) -> Generator {
        GeneratorBuilder::new()
            .generated_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .build(self.root())
            .unwrap()
    }

    pub fn listing(&self, rel: &str) -> DirectoryRecord {
        let raw = fs::read_to_string(self.root().join(rel).join("dir.json")).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    pub fn manifest(&self) -> RootManifest {
        let raw = fs::read_to_string(self.root().join("manifest.json")).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    /// Every generated file with its bytes
    pub fn snapshot(&self) -> anyhow::Result<BTreeMap<PathBuf, Vec<u8>>> {
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(self.root()) {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy();
            if name == "dir.json" || name == "manifest.json" {
                files.insert(entry.path().strip_prefix(self.root())?.to_path_buf(), fs::read(entry.path())?);
            }
        }
        Ok(files)
    }

    /// Modification time of every directory
    pub fn dir_mtimes(&self) -> BTreeMap<PathBuf, FileTime> {
        WalkDir::new(self.root())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| {
                let meta = fs::metadata(e.path()).unwrap();
                (e.path().to_path_buf(), FileTime::from_last_modification_time(&meta))
            })
            .collect()
    }
}

/// Populate a layout resembling a production update server
pub fn populate_mirror(harness: &MirrorHarness) {
    harness.file("offline-package/setup.bin", b"0123456789");
    harness.file("offline-package/setup.bin.sha256sum", b"abc  setup.bin\n");
    harness.file("offline-package/README.md", b"# Offline installers\n");
    harness.file("deb/pool/main/x/xray_1.0_amd64.deb", b"deb");
    harness.file("deb/SHA256SUMS", b"abc  pool/main/x/xray_1.0_amd64.deb\n");
    harness.file("deb/Release", b"Origin: mirror\n");
    harness.file("xray-core/v1.8.0/Xray-linux-64.zip", b"zip");
    harness.file("xray-core/v1.8.0/sha256sum.txt", b"abc  Xray-linux-64.zip\n");
    harness.file("xray-core/tldr.md", b"Latest: v1.8.0\n");
    harness.file("ui/index.html", b"<html>");
    harness.file("out/build.log", b"log");
    harness.file("node_modules/pkg/index.js", b"js");
    harness.file(".github/workflows/sync.yml", b"on: push");
    harness.file(".DS_Store", b"junk");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_offline_package_scenario() {
        let harness = MirrorHarness::new();
        harness.file("offline-package/setup.bin", b"0123456789");
        harness.file("offline-package/setup.bin.sha256sum", b"abc  setup.bin\n");

        harness.generator().run().unwrap();

        let listing = harness.listing("offline-package");
        assert_eq!(listing.path, "/offline-package/");
        assert_eq!(listing.items.len(), 1);
        let item = &listing.items[0];
        assert_eq!(item.name, "setup.bin");
        assert_eq!(item.size, Some(10));
        assert_eq!(item.href, "/offline-package/setup.bin");
        assert_eq!(item.checksum_ref.as_deref(), Some("/offline-package/setup.bin.sha256sum"));

        let manifest = harness.manifest();
        assert_eq!(manifest.roots.len(), 1);
        let bucket = &manifest.roots[0];
        assert_eq!(bucket.name, "offline-package");
        assert_eq!(bucket.href, "/offline-package/");
        assert_eq!(bucket.item_count, 1);
        assert_eq!(bucket.summary, "Offline installers & air-gapped bundles");
    }

    #[test]
    fn test_full_mirror_layout() {
        let harness = MirrorHarness::new();
        populate_mirror(&harness);
        harness.generator().run().unwrap();

        let manifest = harness.manifest();
        let names: Vec<&str> = manifest.roots.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["deb", "offline-package", "xray-core"]);
        assert_eq!(manifest.roots[0].item_count, 3);
        assert_eq!(manifest.roots[2].summary, "Xray-core releases");

        let deb = harness.listing("deb");
        let names: Vec<&str> = deb.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["pool/", "Release", "SHA256SUMS"]);
        assert_eq!(deb.items[1].checksum_ref.as_deref(), Some("/deb/SHA256SUMS"));
        assert!(deb.items[0].checksum_ref.is_none());

        let nested = harness.listing("deb/pool/main/x");
        assert_eq!(nested.items[0].checksum_ref, None);

        let release = harness.listing("xray-core/v1.8.0");
        assert_eq!(
            release.items.iter().find(|i| i.name == "Xray-linux-64.zip").unwrap().checksum_ref.as_deref(),
            Some("/xray-core/v1.8.0/sha256sum.txt")
        );
        assert_eq!(harness.listing("xray-core").tldr_ref.as_deref(), Some("/xray-core/tldr.md"));
        assert_eq!(
            harness.listing("offline-package").readme_ref.as_deref(),
            Some("/offline-package/README.md")
        );

        // Reserved roots are still listed and walked, hidden ones are not
        assert!(harness.root().join("ui/dir.json").exists());
        assert!(!harness.root().join(".github/dir.json").exists());
        assert!(!harness.root().join(".github/workflows/dir.json").exists());
    }

    #[test]
    #[traced_test]
    fn test_rerun_is_byte_identical() {
        let harness = MirrorHarness::new();
        populate_mirror(&harness);

        let generator = harness.generator();
        let first_stats = generator.run().unwrap();
        let first = harness.snapshot().unwrap();

        let second_stats = generator.run().unwrap();
        let second = harness.snapshot().unwrap();

        assert_eq!(first, second);
        assert!(first_stats.listings_written > 0);
        assert_eq!(second_stats.listings_written, 0);
        assert_eq!(second_stats.listings_unchanged, first_stats.listings());
        assert!(!second_stats.manifest_written);
    }

    #[test]
    fn test_generation_does_not_bump_directory_mtimes() {
        let harness = MirrorHarness::new();
        populate_mirror(&harness);
        for dir in ["deb/pool/main/x", "deb/pool/main", "deb/pool", "deb", "offline-package"] {
            harness.touch(dir, 1_500_000_000);
        }
        let before = harness.dir_mtimes();

        harness.generator().run().unwrap();

        assert_eq!(harness.dir_mtimes(), before);
    }

    #[test]
    fn test_rerun_picks_up_changes() {
        let harness = MirrorHarness::new();
        populate_mirror(&harness);
        let generator = harness.generator();
        generator.run().unwrap();

        harness.file("deb/pool/main/x/xray_1.1_amd64.deb", b"newer");
        harness.touch("deb/pool/main/x/xray_1.1_amd64.deb", 4_000_000_000);

        let stats = generator.run().unwrap();
        assert!(stats.listings_written >= 1);

        let expected = Utc.timestamp_opt(4_000_000_000, 0).unwrap();
        assert_eq!(harness.listing("deb/pool/main/x").items.len(), 2);
        assert_eq!(harness.listing("deb").updated_at, expected);
        assert_eq!(harness.listing("").updated_at, expected);
        let deb = harness.manifest().roots.into_iter().find(|r| r.name == "deb").unwrap();
        assert_eq!(deb.updated_at, expected);
    }

    #[test]
    fn test_recency_monotonic_across_tree() {
        let harness = MirrorHarness::new();
        populate_mirror(&harness);
        harness.touch("xray-core/v1.8.0/Xray-linux-64.zip", 3_000_000_000);
        harness.touch("deb/Release", 100);

        harness.generator().run().unwrap();

        for entry in WalkDir::new(harness.root()).into_iter().filter_map(|e| e.ok()) {
            if entry.file_name() != "dir.json" {
                continue;
            }
            let record: DirectoryRecord =
                serde_json::from_str(&fs::read_to_string(entry.path()).unwrap()).unwrap();
            for item in &record.items {
                assert!(
                    record.updated_at >= item.updated_at,
                    "{} older than child {}",
                    record.path,
                    item.href
                );
            }
        }
        assert_eq!(
            harness.listing("").updated_at,
            Utc.timestamp_opt(3_000_000_000, 0).unwrap()
        );
    }

    #[test]
    fn test_records_end_with_newline_and_two_space_indent() {
        let harness = MirrorHarness::new();
        harness.file("rpm/a.rpm", b"x");
        harness.generator().run().unwrap();

        let raw = fs::read_to_string(harness.root().join("rpm/dir.json")).unwrap();
        assert!(raw.starts_with("{\n  \"path\": \"/rpm/\",\n  \"updated_at\": "));
        assert!(raw.ends_with("}\n"));

        let manifest = fs::read_to_string(harness.root().join("manifest.json")).unwrap();
        assert!(manifest.starts_with("{\n  \"generated_at\": \"2024-01-01T00:00:00Z\",\n  \"roots\": ["));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let harness = MirrorHarness::new();
        populate_mirror(&harness);
        harness.generator().run().unwrap();

        let leftovers: Vec<_> = WalkDir::new(harness.root())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {:?}", leftovers);
    }
}
