//! Comparison of an extracted tree against its embedded manifest.

use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::info;

use crate::Result;
use crate::UnwrapError;
use crate::digest::compute_digests;
use crate::manifest::DigestManifest;
use crate::manifest::read_manifest;
use crate::manifest::write_manifest;

/// Suffix appended to the extraction directory path for the local manifest.
pub const LOCAL_MANIFEST_SUFFIX: &str = "_unwrap_manifest.md5";

/// Suffix appended to the archive name for the embedded manifest.
pub const EMBEDDED_MANIFEST_SUFFIX: &str = "_manifest.md5";

/// Verdict for a single embedded manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryVerdict {
    /// Manifest key.
    pub key: String,
    /// Digest recorded by the packager.
    pub expected: String,
    /// Digest computed after extraction, if the key exists locally.
    pub actual: Option<String>,
}

impl EntryVerdict {
    /// Returns `true` if the local digest equals the expected one.
    #[must_use]
    pub fn matched(&self) -> bool {
        self.actual.as_deref() == Some(self.expected.as_str())
    }
}

/// Per-entry verdicts for every key of an embedded manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonResult {
    /// Verdicts in embedded-manifest key order.
    pub verdicts: Vec<EntryVerdict>,
}

impl ComparisonResult {
    /// Returns `true` if every embedded entry matched.
    #[must_use]
    pub fn all_matched(&self) -> bool {
        self.verdicts.iter().all(EntryVerdict::matched)
    }

    /// Entries whose digest differs or is missing locally.
    pub fn mismatches(&self) -> impl Iterator<Item = &EntryVerdict> {
        self.verdicts.iter().filter(|v| !v.matched())
    }

    /// Number of mismatched entries.
    #[must_use]
    pub fn mismatch_count(&self) -> usize {
        self.mismatches().count()
    }
}

/// Compares every key of `embedded` against `local`.
///
/// Keys present only in `local` are not examined.
///
/// # Examples
///
/// ```
/// use tarcheck_core::DigestManifest;
/// use tarcheck_core::verification::compare;
///
/// let mut embedded = DigestManifest::new();
/// embedded.insert("a.dpx", "0cc175b9c0f1b6a831c399e269772661");
/// let mut local = embedded.clone();
/// local.insert("extra.dpx", "d41d8cd98f00b204e9800998ecf8427e");
///
/// assert!(compare(&embedded, &local).all_matched());
///
/// embedded.insert("a.dpx", "ffffffffffffffffffffffffffffffff");
/// assert!(!compare(&embedded, &local).all_matched());
/// ```
#[must_use]
pub fn compare(embedded: &DigestManifest, local: &DigestManifest) -> ComparisonResult {
    let verdicts = embedded
        .iter()
        .map(|(key, expected)| {
            let verdict = EntryVerdict {
                key: key.to_string(),
                expected: expected.to_string(),
                actual: local.get(key).map(str::to_string),
            };
            if verdict.matched() {
                debug!("MD5 match: {key}");
            } else {
                debug!("MD5 does not match: {key}");
            }
            verdict
        })
        .collect();
    ComparisonResult { verdicts }
}

/// State of the manifest shipped inside the archive.
#[derive(Debug)]
pub enum EmbeddedCheck {
    /// No embedded manifest; no comparison possible.
    Absent,
    /// A manifest exists but could not be parsed.
    Unreadable {
        /// Path of the embedded manifest.
        path: PathBuf,
        /// Parse or read error.
        error: UnwrapError,
    },
    /// The manifest was read and compared.
    Compared {
        /// Path of the embedded manifest.
        path: PathBuf,
        /// Per-entry verdicts.
        comparison: ComparisonResult,
    },
}

/// Result of verifying one extracted tree.
#[derive(Debug)]
pub struct Verification {
    /// Manifest computed from the extracted tree.
    pub local: DigestManifest,
    /// Where the local manifest was written, if the write succeeded.
    pub local_manifest_path: Option<PathBuf>,
    /// Outcome of the embedded manifest check.
    pub embedded: EmbeddedCheck,
}

/// Path of the local manifest for `extracted_dir`:
/// `<extracted_dir>_unwrap_manifest.md5`.
#[must_use]
pub fn local_manifest_path(extracted_dir: &Path) -> PathBuf {
    let mut path = OsString::from(extracted_dir.as_os_str());
    path.push(LOCAL_MANIFEST_SUFFIX);
    PathBuf::from(path)
}

/// Locates the embedded manifest for `archive_file_name` inside
/// `extracted_dir`.
///
/// `<archive file name>_manifest.md5` is looked up first, then
/// `<archive stem>_manifest.md5`.
#[must_use]
pub fn find_embedded_manifest(extracted_dir: &Path, archive_file_name: &str) -> Option<PathBuf> {
    let stem = Path::new(archive_file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned());

    std::iter::once(archive_file_name.to_string())
        .chain(stem)
        .map(|name| extracted_dir.join(format!("{name}{EMBEDDED_MANIFEST_SUFFIX}")))
        .find(|candidate| candidate.is_file())
}

/// Computes and persists the local manifest for `extracted_dir`, then checks
/// it against the embedded manifest of `archive_file_name` when one exists.
///
/// # Errors
///
/// Returns an error only if the extracted tree cannot be hashed. A failed
/// local manifest write and an unreadable embedded manifest are reported in
/// the returned [`Verification`].
pub fn verify(extracted_dir: &Path, archive_file_name: &str) -> Result<Verification> {
    let local = compute_digests(extracted_dir)?;
    let local_manifest_path = write_manifest(&local, &local_manifest_path(extracted_dir));

    let embedded = match find_embedded_manifest(extracted_dir, archive_file_name) {
        None => {
            info!("MD5 manifest was not extracted from {archive_file_name}. No comparison possible.");
            EmbeddedCheck::Absent
        }
        Some(path) => {
            info!("MD5 manifest for {archive_file_name} exists: {}", path.display());
            match read_manifest(&path) {
                Ok(manifest) => EmbeddedCheck::Compared {
                    comparison: compare(&manifest, &local),
                    path,
                },
                Err(error) => EmbeddedCheck::Unreadable { path, error },
            }
        }
    };

    Ok(Verification {
        local,
        local_manifest_path,
        embedded,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const A_MD5: &str = "0cc175b9c0f1b6a831c399e269772661";
    const B_MD5: &str = "92eb5ffee6ae2fec3ad71c777531578f";

    fn extracted_tree(temp: &TempDir) -> PathBuf {
        let dir = temp.path().join("reel01");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.dpx"), b"a").unwrap();
        fs::write(dir.join("b.dpx"), b"b").unwrap();
        dir
    }

    #[test]
    fn test_local_manifest_path() {
        assert_eq!(
            local_manifest_path(Path::new("/in/reel01")),
            PathBuf::from("/in/reel01_unwrap_manifest.md5")
        );
    }

    #[test]
    fn test_missing_local_key_is_mismatch() {
        let mut embedded = DigestManifest::new();
        embedded.insert("c.dpx", A_MD5);
        let result = compare(&embedded, &DigestManifest::new());
        assert!(!result.all_matched());
        assert_eq!(result.mismatch_count(), 1);
        assert_eq!(result.verdicts[0].actual, None);
    }

    #[test]
    fn test_empty_embedded_manifest_matches() {
        let mut local = DigestManifest::new();
        local.insert("a.dpx", A_MD5);
        assert!(compare(&DigestManifest::new(), &local).all_matched());
    }

    #[test]
    fn test_verify_without_embedded_manifest() {
        let temp = TempDir::new().unwrap();
        let dir = extracted_tree(&temp);

        let verification = verify(&dir, "reel01.tar").unwrap();
        assert!(matches!(verification.embedded, EmbeddedCheck::Absent));
        assert_eq!(verification.local.len(), 2);
        let written = verification.local_manifest_path.unwrap();
        assert_eq!(written, temp.path().join("reel01_unwrap_manifest.md5"));
        assert!(fs::metadata(&written).unwrap().len() > 0);
    }

    #[test]
    fn test_verify_matching_embedded_manifest() {
        let temp = TempDir::new().unwrap();
        let dir = extracted_tree(&temp);
        fs::write(
            dir.join("reel01.tar_manifest.md5"),
            format!(r#"{{"a.dpx": "{A_MD5}", "b.dpx": "{B_MD5}"}}"#),
        )
        .unwrap();

        let verification = verify(&dir, "reel01.tar").unwrap();
        let EmbeddedCheck::Compared { comparison, .. } = verification.embedded else {
            panic!("expected comparison");
        };
        assert!(comparison.all_matched());
        assert_eq!(comparison.verdicts.len(), 2);
    }

    #[test]
    fn test_verify_accepts_stem_named_manifest() {
        let temp = TempDir::new().unwrap();
        let dir = extracted_tree(&temp);
        fs::write(dir.join("reel01_manifest.md5"), format!(r#"{{"a.dpx": "{A_MD5}"}}"#)).unwrap();

        let found = find_embedded_manifest(&dir, "reel01.tar").unwrap();
        assert!(found.ends_with("reel01_manifest.md5"));
    }

    #[test]
    fn test_verify_mismatching_embedded_manifest() {
        let temp = TempDir::new().unwrap();
        let dir = extracted_tree(&temp);
        fs::write(
            dir.join("reel01.tar_manifest.md5"),
            format!(r#"{{"a.dpx": "{A_MD5}", "b.dpx": "{A_MD5}"}}"#),
        )
        .unwrap();

        let verification = verify(&dir, "reel01.tar").unwrap();
        let EmbeddedCheck::Compared { comparison, .. } = verification.embedded else {
            panic!("expected comparison");
        };
        assert!(!comparison.all_matched());
        let bad: Vec<_> = comparison.mismatches().map(|v| v.key.as_str()).collect();
        assert_eq!(bad, vec!["b.dpx"]);
    }

    #[test]
    fn test_verify_unreadable_embedded_manifest() {
        let temp = TempDir::new().unwrap();
        let dir = extracted_tree(&temp);
        fs::write(dir.join("reel01.tar_manifest.md5"), "[1, 2, 3]").unwrap();

        let verification = verify(&dir, "reel01.tar").unwrap();
        assert!(matches!(
            verification.embedded,
            EmbeddedCheck::Unreadable {
                error: UnwrapError::ManifestFormat { .. },
                ..
            }
        ));
        assert!(verification.local_manifest_path.is_some());
    }
}
