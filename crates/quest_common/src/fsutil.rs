//! Atomic file operations for durable game state.
//!
//! The progress record is rewritten wholesale on every mutation, so a crash
//! mid-write must leave either the old record or the new one on disk, never
//! a torn file. Temp file + fsync + rename gives that on any POSIX
//! filesystem.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Write data to a file atomically using temp file + rename.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Temp file must live in the same directory for the rename to be atomic.
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Write string data atomically.
pub fn atomic_write_str(path: &Path, data: &str) -> io::Result<()> {
    atomic_write(path, data.as_bytes())
}

/// Safely delete a file (no error if it doesn't exist).
pub fn safe_delete(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("deep/nested/state.json");

        atomic_write_str(&file, "{}").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "{}");
    }

    #[test]
    fn test_atomic_write_replaces_whole_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("state.json");

        atomic_write_str(&file, "a much longer first record").unwrap();
        atomic_write_str(&file, "short").unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "short");
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("state.json");

        atomic_write_str(&file, "data").unwrap();
        assert!(!file.with_extension("tmp").exists());
    }

    #[test]
    fn test_safe_delete_missing_is_ok() {
        let temp = TempDir::new().unwrap();
        safe_delete(&temp.path().join("never-existed")).unwrap();
    }
}
