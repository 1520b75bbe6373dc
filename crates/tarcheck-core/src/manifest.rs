//! Digest manifests and their JSON codec.
//!
//! A manifest maps a file identifier to the lower case hex MD5 digest of the
//! file's bytes. On disk it is a single JSON object of string values, the
//! format preservation packagers embed next to the packaged data.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::warn;

use crate::Result;
use crate::UnwrapError;

/// Mapping from file identifier to hex digest.
///
/// Keys are unique; inserting an existing key replaces its digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestManifest {
    entries: BTreeMap<String, String>,
}

impl DigestManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a digest, returning the digest previously stored under `key`.
    pub fn insert(&mut self, key: impl Into<String>, digest: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), digest.into())
    }

    /// Looks up the digest recorded for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns `true` if `key` has a digest.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, digest)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for DigestManifest {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Serializes `manifest` to `path` as JSON indented by four spaces.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn try_write_manifest(manifest: &DigestManifest, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    manifest
        .entries
        .serialize(&mut serializer)
        .map_err(std::io::Error::from)?;
    writer.flush()?;
    Ok(())
}

/// Writes `manifest` to `path`, returning the path if the file exists
/// afterwards.
///
/// A write failure is logged as a warning and reported as `None`; callers
/// keep working with the in-memory manifest.
pub fn write_manifest(manifest: &DigestManifest, path: &Path) -> Option<PathBuf> {
    if let Err(e) = try_write_manifest(manifest, path) {
        warn!("failed to write manifest {}: {e}", path.display());
    }
    path.exists().then(|| path.to_path_buf())
}

/// Reads a manifest from `path`.
///
/// # Errors
///
/// Returns [`UnwrapError::ManifestFormat`] if the file is not JSON, if the
/// top-level value is not an object, or if a digest is not a string.
/// Returns [`UnwrapError::Io`] if the file cannot be opened.
pub fn read_manifest(path: &Path) -> Result<DigestManifest> {
    let file = File::open(path)?;
    let value: Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| UnwrapError::ManifestFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let Value::Object(map) = value else {
        return Err(UnwrapError::ManifestFormat {
            path: path.to_path_buf(),
            reason: "top-level value is not a mapping".to_string(),
        });
    };

    map.into_iter()
        .map(|(key, digest)| match digest {
            Value::String(digest) => Ok((key, digest)),
            other => Err(UnwrapError::ManifestFormat {
                path: path.to_path_buf(),
                reason: format!("digest for {key} is not a string: {other}"),
            }),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample() -> DigestManifest {
        let mut manifest = DigestManifest::new();
        manifest.insert("a.dpx", "0cc175b9c0f1b6a831c399e269772661");
        manifest.insert("reel1_ASSETMAP", "92eb5ffee6ae2fec3ad71c777531578f");
        manifest
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("reel01_unwrap_manifest.md5");

        let written = write_manifest(&sample(), &path);
        assert_eq!(written.as_deref(), Some(path.as_path()));
        assert_eq!(read_manifest(&path).unwrap(), sample());
    }

    #[test]
    fn test_written_file_is_indented() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("m.md5");
        write_manifest(&sample(), &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    \"a.dpx\": \"0cc175b9c0f1b6a831c399e269772661\""));
    }

    #[test]
    fn test_write_failure_returns_none() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing_dir").join("m.md5");
        assert!(write_manifest(&sample(), &path).is_none());
    }

    #[test]
    fn test_read_rejects_non_mapping() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("m.md5");
        fs::write(&path, r#"["a.dpx", "b.dpx"]"#).unwrap();

        let err = read_manifest(&path).unwrap_err();
        assert!(matches!(err, UnwrapError::ManifestFormat { .. }));
        assert!(err.to_string().contains("not a mapping"));
    }

    #[test]
    fn test_read_rejects_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("m.md5");
        fs::write(&path, "a.dpx  0cc175b9c0f1b6a831c399e269772661\n").unwrap();

        let err = read_manifest(&path).unwrap_err();
        assert!(matches!(err, UnwrapError::ManifestFormat { .. }));
    }

    #[test]
    fn test_read_rejects_non_string_digest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("m.md5");
        fs::write(&path, r#"{"a.dpx": 12}"#).unwrap();

        let err = read_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("a.dpx"));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = read_manifest(&temp.path().join("absent.md5")).unwrap_err();
        assert!(matches!(err, UnwrapError::Io(_)));
    }

    #[test]
    fn test_insert_replaces() {
        let mut manifest = DigestManifest::new();
        assert!(manifest.insert("ASSETMAP", "aa").is_none());
        assert_eq!(manifest.insert("ASSETMAP", "bb").as_deref(), Some("aa"));
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("ASSETMAP"), Some("bb"));
    }
}
