//! Locating input documents and preparing the output directory.

use crate::error::OutputError;
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The input files under `path`, sorted by path. A file is returned as is.
/// Subdirectories are only descended into when `recursive` is set.
pub fn find_input_files(path: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if path.is_file() {
        files.push(path.to_path_buf());
    } else {
        collect_files(path, recursive, &mut files)?;
        files.sort();
    }
    debug!("Found {} input files under {}", files.len(), path.display());
    Ok(files)
}

fn collect_files(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                collect_files(&path, recursive, files)?;
            }
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Checks that `path` is a writable directory, creating it first when asked to.
pub fn ensure_output_dir(path: &Path, create: bool) -> Result<(), OutputError> {
    if !path.exists() {
        if !create {
            return Err(OutputError::DirectoryMissing(path.to_path_buf()));
        }
        debug!("Creating output directory {}", path.display());
        fs::create_dir_all(path)?;
    }
    let metadata = fs::metadata(path)?;
    if !metadata.is_dir() {
        return Err(OutputError::NotADirectory(path.to_path_buf()));
    }
    if metadata.permissions().readonly() {
        return Err(OutputError::NotWritable(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_input_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.xml"), "<b/>").unwrap();
        fs::write(dir.path().join("a.xml"), "<a/>").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.xml"), "<c/>").unwrap();

        let flat = find_input_files(dir.path(), false).unwrap();
        assert_eq!(flat, vec![dir.path().join("a.xml"), dir.path().join("b.xml")]);

        let deep = find_input_files(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
        assert_eq!(deep[2], dir.path().join("nested").join("c.xml"));

        let single = find_input_files(&dir.path().join("b.xml"), false).unwrap();
        assert_eq!(single, vec![dir.path().join("b.xml")]);
    }

    #[test]
    fn test_ensure_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("out");
        assert!(matches!(
            ensure_output_dir(&missing, false),
            Err(OutputError::DirectoryMissing(_))
        ));
        ensure_output_dir(&missing, true).unwrap();
        assert!(missing.is_dir());

        let file = dir.path().join("file.csv");
        fs::write(&file, "").unwrap();
        assert!(matches!(
            ensure_output_dir(&file, true),
            Err(OutputError::NotADirectory(_))
        ));
    }
}
