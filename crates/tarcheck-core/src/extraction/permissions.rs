//! Directory creation and permission handling for extraction targets.
//!
//! Extraction directories are left world-accessible so that downstream
//! encoding tools running under other accounts can read and clean them.

use std::fs;
use std::path::Path;

use crate::Result;

/// Mode applied to extraction directories.
pub const OPEN_DIR_MODE: u32 = 0o777;

/// Creates `path` (and missing parents) with [`OPEN_DIR_MODE`]. An existing
/// directory is left as it is.
///
/// The process umask still applies at creation time; call
/// [`open_permissions`] to force the final mode.
pub fn create_open_dir(path: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(OPEN_DIR_MODE);
    }
    builder.create(path)?;
    Ok(())
}

/// Sets the mode of `path` to [`OPEN_DIR_MODE`]. No-op on non-Unix targets.
pub fn open_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(OPEN_DIR_MODE))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Returns `true` if `path` is a directory with no entries.
pub fn is_empty_dir(path: &Path) -> Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}
