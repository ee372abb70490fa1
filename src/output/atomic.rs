// src/output/atomic.rs
//! Atomic file writes.
//!
//! Every exported file is written to a temp file in the destination
//! directory and renamed into place, so an interrupted run never
//! leaves a half-written markdown or state file behind.

use crate::error::AppError;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Write `contents` to `path` atomically.
///
/// Parent directories are created as needed. The temp file lives in
/// the same directory as the target so the rename stays on one
/// filesystem.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output");
    let tmp_path = path.with_file_name(format!(
        ".{}.{}.tmp",
        file_name,
        Uuid::new_v4().as_simple()
    ));

    fs::write(&tmp_path, contents)?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}

/// Create a directory (and parents) and hand the path back.
pub fn safe_mkdir(path: &Path) -> Result<PathBuf, AppError> {
    fs::create_dir_all(path)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn writes_file_and_creates_parents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a/b/c.md");
        atomic_write(&target, b"hello").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "hello");
    }

    #[test]
    fn replaces_existing_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("note.md");
        atomic_write(&target, b"old").unwrap();
        atomic_write(&target, b"new").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn leaves_no_temp_files_behind() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("note.md");
        atomic_write(&target, b"x").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["note.md"]);
    }

    #[test]
    fn failed_rename_cleans_up_temp() {
        let dir = tempdir().unwrap();
        // A non-empty directory at the target path makes the rename
        // fail on every platform.
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), b"keep").unwrap();

        assert!(atomic_write(&target, b"data").is_err());
        assert!(fs::read_to_string(target.join("keep.txt")).is_ok());

        let stray: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tmp"))
            .collect();
        assert!(stray.is_empty(), "stray temp files: {:?}", stray);
    }
}
