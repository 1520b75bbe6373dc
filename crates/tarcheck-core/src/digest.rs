//! MD5 digests of an extracted directory tree.
//!
//! Files are streamed through a reusable 64 KiB buffer, so arbitrarily large
//! image sequences are hashed without loading them into memory.

use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;

use md5::Digest;
use md5::Md5;
use tracing::debug;
use walkdir::WalkDir;

use crate::Result;
use crate::UnwrapError;
use crate::manifest::DigestManifest;

/// Read buffer size for hashing (64 KiB).
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Package-description file names that recur across sub-packages and are
/// keyed by their parent directory.
pub const PACKAGE_DESCRIPTION_FILES: [&str; 4] =
    ["ASSETMAP", "VOLINDEX", "ASSETMAP.xml", "VOLINDEX.xml"];

/// Reusable heap buffer for streaming file contents into a hasher.
#[derive(Debug)]
pub struct HashBuffer {
    buf: Box<[u8]>,
}

impl HashBuffer {
    /// Creates a new zeroed buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; HASH_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Returns the buffer size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

impl Default for HashBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Hashes everything readable from `reader` and returns the lower case hex
/// MD5 digest.
///
/// # Errors
///
/// Returns an error if reading fails. Interrupted reads are retried.
pub fn md5_hex<R: Read>(reader: &mut R, buffer: &mut HashBuffer) -> Result<String> {
    let mut hasher = Md5::new();
    loop {
        let n = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(UnwrapError::Io(e)),
        };
        hasher.update(&buffer.buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Hashes the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn md5_file(path: &Path, buffer: &mut HashBuffer) -> Result<String> {
    let mut file = File::open(path)?;
    md5_hex(&mut file, buffer)
}

/// Returns the manifest key for a file named `file_name` inside a directory
/// named `parent_name`.
///
/// # Examples
///
/// ```
/// use tarcheck_core::digest::manifest_key;
///
/// assert_eq!(manifest_key("reel1", "ASSETMAP"), "reel1_ASSETMAP");
/// assert_eq!(manifest_key("reel1", "0001.dpx"), "0001.dpx");
/// assert_eq!(manifest_key("reel1", "assetmap"), "assetmap");
/// ```
#[must_use]
pub fn manifest_key(parent_name: &str, file_name: &str) -> String {
    if PACKAGE_DESCRIPTION_FILES.contains(&file_name) {
        format!("{parent_name}_{file_name}")
    } else {
        file_name.to_string()
    }
}

/// Computes the digest manifest of every regular file under `root`.
///
/// Keys are bare file names, except for package-description files, which
/// are prefixed with their parent directory name. Entries are visited in
/// file-name order, so when two ordinary files share a name the one visited
/// last wins. Symlinks are not followed.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or a file cannot be read.
pub fn compute_digests(root: &Path) -> Result<DigestManifest> {
    let mut manifest = DigestManifest::new();
    let mut buffer = HashBuffer::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| UnwrapError::Walk {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy();
        let parent_name = path
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();

        let key = manifest_key(&parent_name, &file_name);
        let digest = md5_file(path, &mut buffer)?;
        debug!("{key}: {digest}");
        if let Some(previous) = manifest.insert(key.clone(), digest) {
            debug!("digest for {key} replaced (was {previous})");
        }
    }

    Ok(manifest)
}
