use std::fs;
use std::io;
use std::path::Path;

use crate::error::Result;

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Remove a file, treating "already gone" as success.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Move `from` onto `to`, replacing whatever is at `to`.
pub fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    remove_if_exists(to)?;
    fs::rename(from, to)
}

/// Deletes the wrapped path when dropped.
pub struct RemoveOnDrop<'a>(pub &'a Path);

impl Drop for RemoveOnDrop<'_> {
    fn drop(&mut self) {
        if let Err(e) = remove_if_exists(self.0) {
            crate::utils::logger::error(&format!(
                "Failed to remove {}: {}",
                self.0.display(),
                e
            ));
        }
    }
}
