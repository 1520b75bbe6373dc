//! Final placement of archives and their artifacts.

use std::fs;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::info;
use tracing::warn;
use walkdir::WalkDir;

use crate::Result;
use crate::UnwrapError;
use crate::audit::ErrorRecords;
use crate::audit::completed_log_name;
use crate::extraction::permissions::is_empty_dir;

/// What happened to the extraction directory of a failed archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leftover {
    /// No extraction directory existed.
    Absent,
    /// The directory was empty and has been deleted.
    Removed,
    /// The directory had partial content and was moved for review.
    Relocated(PathBuf),
}

/// Placement of an archive whose extraction failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailurePlacement {
    /// New location of the archive.
    pub archive: PathBuf,
    /// Handling of the extraction directory.
    pub leftover: Leftover,
}

/// Placement of an archive that extracted successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPlacement {
    /// New location of the archive.
    pub archive: PathBuf,
    /// Renamed error record, if the archive had one.
    pub log: Option<PathBuf>,
}

/// Moves archives to the completed or failed location.
///
/// Placement depends on extraction alone: an archive that extracted is
/// completed even when its manifest did not match.
#[derive(Debug, Clone)]
pub struct OutcomeRouter {
    completed_dir: PathBuf,
    failed_dir: PathBuf,
}

impl OutcomeRouter {
    /// Creates a router for the given locations.
    #[must_use]
    pub fn new(completed_dir: impl Into<PathBuf>, failed_dir: impl Into<PathBuf>) -> Self {
        Self {
            completed_dir: completed_dir.into(),
            failed_dir: failed_dir.into(),
        }
    }

    /// Completed location.
    #[must_use]
    pub fn completed_dir(&self) -> &Path {
        &self.completed_dir
    }

    /// Failed location.
    #[must_use]
    pub fn failed_dir(&self) -> &Path {
        &self.failed_dir
    }

    /// Creates both locations if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.completed_dir)?;
        fs::create_dir_all(&self.failed_dir)?;
        Ok(())
    }

    /// Moves a failed archive to the failed location and deals with its
    /// extraction directory: an empty one is deleted, one with content is
    /// moved next to the archive.
    ///
    /// Every destination is checked before anything moves, so a collision
    /// leaves the archive and its extraction directory where they were.
    pub fn route_failure(&self, archive: &Path, extraction_dir: &Path) -> Result<FailurePlacement> {
        let archive_dest = free_destination(archive, &self.failed_dir)?;
        let keep_leftover = extraction_dir.is_dir() && !is_empty_dir(extraction_dir)?;
        let leftover_dest = if keep_leftover {
            Some(free_destination(extraction_dir, &self.failed_dir)?)
        } else {
            None
        };

        move_path(archive, &archive_dest)?;
        info!("moved {} to failed location", archive_dest.display());

        let leftover = match leftover_dest {
            Some(dest) => {
                move_path(extraction_dir, &dest)?;
                Leftover::Relocated(dest)
            }
            None if extraction_dir.is_dir() => {
                fs::remove_dir(extraction_dir)?;
                Leftover::Removed
            }
            None => Leftover::Absent,
        };

        Ok(FailurePlacement {
            archive: archive_dest,
            leftover,
        })
    }

    /// Moves an extracted archive to the completed location. An error
    /// record for `stem` is renamed to `<stem>.log` and moved alongside; if
    /// that log already exists from an earlier run, the record is appended
    /// to it.
    ///
    /// Once the archive has moved, a record that cannot be promoted is left
    /// in the failed location and reported as `log: None`.
    pub fn route_completed(
        &self,
        archive: &Path,
        stem: &str,
        records: &ErrorRecords,
    ) -> Result<CompletedPlacement> {
        let archive_dest = free_destination(archive, &self.completed_dir)?;
        move_path(archive, &archive_dest)?;
        info!("moved {} to completed location", archive_dest.display());

        let log = if records.exists(stem) {
            let dest = self.completed_dir.join(completed_log_name(stem));
            match promote_record(&records.path_for(stem), &dest) {
                Ok(()) => Some(dest),
                Err(e) => {
                    warn!("error record for {stem} left in failed location: {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok(CompletedPlacement {
            archive: archive_dest,
            log,
        })
    }
}

/// Destination of `src` inside `dest_dir`, which must not exist yet.
fn free_destination(src: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let name = src.file_name().ok_or_else(|| UnwrapError::InvalidConfig {
        reason: format!("cannot relocate path without a file name: {}", src.display()),
    })?;
    let dest = dest_dir.join(name);
    if dest.exists() {
        return Err(UnwrapError::DestinationExists { path: dest });
    }
    Ok(dest)
}

/// Moves an error record to `dest`, appending to it if `dest` exists.
fn promote_record(record: &Path, dest: &Path) -> Result<()> {
    if !dest.exists() {
        return move_path(record, dest);
    }
    let body = fs::read(record)?;
    let mut log = OpenOptions::new().append(true).open(dest)?;
    log.write_all(&body)?;
    fs::remove_file(record)?;
    Ok(())
}

/// Moves `src` into `dest_dir`, keeping its file name.
///
/// # Errors
///
/// Returns [`UnwrapError::DestinationExists`] rather than overwrite.
pub fn relocate(src: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let dest = free_destination(src, dest_dir)?;
    move_path(src, &dest)?;
    Ok(dest)
}

/// Moves a file or directory, copying then deleting when a rename crosses
/// filesystems.
pub fn move_path(src: &Path, dest: &Path) -> Result<()> {
    if dest.exists() {
        return Err(UnwrapError::DestinationExists {
            path: dest.to_path_buf(),
        });
    }
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => copy_then_remove(src, dest),
        Err(e) => Err(e.into()),
    }
}

fn copy_then_remove(src: &Path, dest: &Path) -> Result<()> {
    if src.is_dir() {
        for entry in WalkDir::new(src) {
            let entry = entry.map_err(|e| UnwrapError::Walk {
                path: src.to_path_buf(),
                reason: e.to_string(),
            })?;
            let relative = entry.path().strip_prefix(src).map_err(|e| UnwrapError::Walk {
                path: src.to_path_buf(),
                reason: e.to_string(),
            })?;
            let target = dest.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                fs::copy(entry.path(), &target)?;
            }
        }
        fs::remove_dir_all(src)?;
    } else {
        fs::copy(src, dest)?;
        fs::remove_file(src)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn router(temp: &TempDir) -> OutcomeRouter {
        let router = OutcomeRouter::new(temp.path().join("completed"), temp.path().join("failed"));
        router.ensure_dirs().unwrap();
        router
    }

    #[test]
    fn test_route_failure_removes_empty_dir() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        let archive = temp.path().join("bad.tar");
        fs::write(&archive, b"junk").unwrap();
        fs::create_dir(temp.path().join("bad")).unwrap();

        let placement = router.route_failure(&archive, &temp.path().join("bad")).unwrap();
        assert_eq!(placement.archive, temp.path().join("failed").join("bad.tar"));
        assert_eq!(placement.leftover, Leftover::Removed);
        assert!(!archive.exists());
        assert!(!temp.path().join("bad").exists());
        assert!(!temp.path().join("failed").join("bad").exists());
    }

    #[test]
    fn test_route_failure_relocates_partial_dir() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        let archive = temp.path().join("bad.tar");
        fs::write(&archive, b"junk").unwrap();
        fs::create_dir(temp.path().join("bad")).unwrap();
        fs::write(temp.path().join("bad").join("a.dpx"), b"a").unwrap();

        let placement = router.route_failure(&archive, &temp.path().join("bad")).unwrap();
        let moved = temp.path().join("failed").join("bad");
        assert_eq!(placement.leftover, Leftover::Relocated(moved.clone()));
        assert!(moved.join("a.dpx").exists());
    }

    #[test]
    fn test_route_failure_without_dir() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        let archive = temp.path().join("bad.tar");
        fs::write(&archive, b"junk").unwrap();

        let placement = router.route_failure(&archive, &temp.path().join("bad")).unwrap();
        assert_eq!(placement.leftover, Leftover::Absent);
    }

    #[test]
    fn test_route_completed_promotes_error_record() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        let records = ErrorRecords::new(router.failed_dir());
        records.append("reel01", "MD5 manifests do not match").unwrap();
        let archive = temp.path().join("reel01.tar");
        fs::write(&archive, b"tar").unwrap();

        let placement = router.route_completed(&archive, "reel01", &records).unwrap();
        assert_eq!(placement.archive, temp.path().join("completed").join("reel01.tar"));
        let log = placement.log.unwrap();
        assert_eq!(log, temp.path().join("completed").join("reel01.log"));
        assert!(fs::read_to_string(log).unwrap().contains("do not match"));
        assert!(!records.exists("reel01"));
    }

    #[test]
    fn test_route_completed_appends_to_existing_log() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        let previous = temp.path().join("completed").join("reel01.log");
        fs::write(&previous, "unwrap_tar earlier: first run.\n\n").unwrap();
        let records = ErrorRecords::new(router.failed_dir());
        records.append("reel01", "MD5 manifests do not match").unwrap();
        let archive = temp.path().join("reel01.tar");
        fs::write(&archive, b"tar").unwrap();

        let placement = router.route_completed(&archive, "reel01", &records).unwrap();
        assert_eq!(placement.log.as_deref(), Some(previous.as_path()));
        let text = fs::read_to_string(&previous).unwrap();
        assert!(text.starts_with("unwrap_tar earlier: first run."));
        assert!(text.contains("do not match"));
        assert!(!records.exists("reel01"));
    }

    #[test]
    fn test_route_completed_collision_moves_nothing() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        fs::write(temp.path().join("completed").join("reel01.tar"), b"old").unwrap();
        let records = ErrorRecords::new(router.failed_dir());
        records.append("reel01", "MD5 manifests do not match").unwrap();
        let archive = temp.path().join("reel01.tar");
        fs::write(&archive, b"new").unwrap();

        let err = router.route_completed(&archive, "reel01", &records).unwrap_err();
        assert!(matches!(err, UnwrapError::DestinationExists { .. }));
        assert!(archive.exists());
        assert!(records.exists("reel01"));
    }

    #[test]
    fn test_route_failure_collision_moves_nothing() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        fs::create_dir(temp.path().join("failed").join("bad")).unwrap();
        let archive = temp.path().join("bad.tar");
        fs::write(&archive, b"junk").unwrap();
        fs::create_dir(temp.path().join("bad")).unwrap();
        fs::write(temp.path().join("bad").join("a.dpx"), b"a").unwrap();

        let err = router.route_failure(&archive, &temp.path().join("bad")).unwrap_err();
        assert!(matches!(err, UnwrapError::DestinationExists { .. }));
        assert!(archive.exists());
        assert!(!temp.path().join("failed").join("bad.tar").exists());
        assert!(temp.path().join("bad").join("a.dpx").exists());
    }

    #[test]
    fn test_route_completed_without_record() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        let records = ErrorRecords::new(router.failed_dir());
        let archive = temp.path().join("reel01.tar");
        fs::write(&archive, b"tar").unwrap();

        let placement = router.route_completed(&archive, "reel01", &records).unwrap();
        assert!(placement.log.is_none());
    }

    #[test]
    fn test_relocate_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let router = router(&temp);
        fs::write(temp.path().join("completed").join("reel01.tar"), b"old").unwrap();
        let archive = temp.path().join("reel01.tar");
        fs::write(&archive, b"new").unwrap();

        let err = relocate(&archive, router.completed_dir()).unwrap_err();
        assert!(matches!(err, UnwrapError::DestinationExists { .. }));
        assert!(archive.exists());
    }

    #[test]
    fn test_copy_then_remove_directory() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("nested").join("a.dpx"), b"a").unwrap();
        let dest = temp.path().join("dest");

        copy_then_remove(&src, &dest).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(dest.join("nested").join("a.dpx")).unwrap(), b"a");
    }
}
