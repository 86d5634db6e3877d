//! Create-if-absent directory helpers.
//!
//! Every directory the pipeline makes may already exist from an earlier run,
//! so none of these fail on an existing directory.

use std::fs;
use std::io;
use std::path::Path;

/// Create `dir` and any missing parents.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

/// Create `dir` and any missing parents with the permission bits of `like`.
///
/// Falls back to default permissions when `like` cannot be read, and on
/// platforms without unix modes.
pub fn ensure_dir_like(dir: &Path, like: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
        if let Ok(meta) = fs::metadata(like) {
            return fs::DirBuilder::new()
                .recursive(true)
                .mode(meta.permissions().mode() & 0o7777)
                .create(dir);
        }
    }
    #[cfg(not(unix))]
    let _ = like;
    fs::create_dir_all(dir)
}
