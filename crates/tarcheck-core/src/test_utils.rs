//! Test utilities for building tar packages and mocking the external tool.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::fs;
use std::io;
use std::path::Path;

use crate::extraction::ExtractTool;
use crate::extraction::ToolStatus;
use crate::extraction::unpack_in_process;

/// Creates an in-memory TAR archive from a list of entries.
///
/// Each entry is a tuple of (path, content). Files are created with mode 0o644.
///
/// # Examples
///
/// ```
/// use tarcheck_core::test_utils::create_test_tar;
///
/// let tar_data = create_test_tar(vec![("a.dpx", b"a"), ("scan/b.dpx", b"b")]);
/// ```
#[must_use]
pub fn create_test_tar(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    entries
        .into_iter()
        .fold(TarTestBuilder::new(), |builder, (path, data)| {
            builder.add_file(path, data)
        })
        .build()
}

/// Builder for TAR test packages.
///
/// # Examples
///
/// ```
/// use tarcheck_core::test_utils::TarTestBuilder;
///
/// let tar_data = TarTestBuilder::new()
///     .add_directory("reel1/")
///     .add_file("reel1/ASSETMAP", b"<AssetMap/>")
///     .add_manifest("reel01.tar", &[("ASSETMAP", "0cc175b9c0f1b6a831c399e269772661")])
///     .build();
/// ```
pub struct TarTestBuilder {
    builder: tar::Builder<Vec<u8>>,
}

impl TarTestBuilder {
    /// Creates a new TAR test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    /// Adds a regular file to the archive.
    #[must_use]
    pub fn add_file(mut self, path: &str, data: &[u8]) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    /// Adds a directory to the archive.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Directory);
        header.set_cksum();
        self.builder
            .append_data(&mut header, path, io::empty())
            .unwrap();
        self
    }

    /// Adds an embedded digest manifest named `<archive_name>_manifest.md5`
    /// at the archive root.
    #[must_use]
    pub fn add_manifest(self, archive_name: &str, entries: &[(&str, &str)]) -> Self {
        let map: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), serde_json::Value::String((*v).to_string())))
            .collect();
        let body = serde_json::to_vec_pretty(&map).unwrap();
        self.add_file(&format!("{archive_name}_manifest.md5"), &body)
    }

    /// Builds and returns the TAR archive data.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }
}

impl Default for TarTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase hex MD5 of `data`.
#[must_use]
pub fn md5_of(data: &[u8]) -> String {
    use md5::Digest;
    hex::encode(md5::Md5::digest(data))
}

/// Tool that always exits non-zero without touching the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTool;

impl ExtractTool for FailingTool {
    fn run(&self, _archive: &Path, _target: &Path) -> io::Result<ToolStatus> {
        Ok(ToolStatus::Failed { code: Some(2) })
    }

    fn name(&self) -> String {
        "MOCK TAR".to_string()
    }
}

/// Tool that unpacks with the tar crate and exits zero, standing in for a
/// working system `tar`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnpackingTool;

impl ExtractTool for UnpackingTool {
    fn run(&self, archive: &Path, target: &Path) -> io::Result<ToolStatus> {
        match unpack_in_process(archive, target) {
            Ok(()) => Ok(ToolStatus::Success),
            Err(_) => Ok(ToolStatus::Failed { code: Some(2) }),
        }
    }

    fn name(&self) -> String {
        "MOCK TAR".to_string()
    }
}

/// Tool that writes one stray file into the target and then exits non-zero,
/// like a tar run interrupted part way through.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialTool;

impl ExtractTool for PartialTool {
    fn run(&self, _archive: &Path, target: &Path) -> io::Result<ToolStatus> {
        fs::write(target.join("partial.dpx"), b"partial")?;
        Ok(ToolStatus::Failed { code: Some(2) })
    }

    fn name(&self) -> String {
        "MOCK TAR".to_string()
    }
}
