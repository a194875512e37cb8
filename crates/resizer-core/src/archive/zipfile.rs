//! ZIP extraction.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use zip::ZipArchive;

use super::sanitize_entry_path;
use crate::error::ArchiveError;

pub(super) fn extract_zip(source: &Path, target: &Path) -> Result<(), ArchiveError> {
    let file = File::open(source).map_err(|e| ArchiveError::io(source, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| extraction(source, e))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| extraction(source, e))?;
        let entry_path = sanitize_entry_path(entry.name())?;
        if entry_path.as_os_str().is_empty() {
            continue;
        }
        let destination = target.join(&entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&destination).map_err(|e| ArchiveError::io(&destination, e))?;
            continue;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }

        let mut output = File::create(&destination).map_err(|e| ArchiveError::io(&destination, e))?;
        // Truncated or corrupt entries surface here as read errors.
        io::copy(&mut entry, &mut output).map_err(|e| extraction(source, e))?;
    }

    Ok(())
}

fn extraction(source: &Path, err: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::Extraction {
        path: source.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        for (name, contents) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extract_preserves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("in.zip");
        write_zip(&archive, &[("a.txt", b"one"), ("nested/deeper/b.txt", b"two")]);
        let dest = dir.path().join("out");
        fs::create_dir_all(&dest).unwrap();

        extract_zip(&archive, &dest).unwrap();
        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"one");
        assert_eq!(fs::read(dest.join("nested/deeper/b.txt")).unwrap(), b"two");
    }

    #[test]
    fn test_rejects_traversal_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        write_zip(&archive, &[("../escape.txt", b"boom")]);
        let dest = dir.path().join("out");
        fs::create_dir_all(&dest).unwrap();

        let err = extract_zip(&archive, &dest).unwrap_err();
        assert!(matches!(err, ArchiveError::UnsafeEntry { .. }));
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_truncated_archive_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("full.zip");
        write_zip(&archive, &[("a.txt", &[7u8; 4096])]);
        let bytes = fs::read(&archive).unwrap();
        let truncated = dir.path().join("truncated.zip");
        fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();

        let err = extract_zip(&truncated, dir.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::Extraction { .. }));
    }
}
