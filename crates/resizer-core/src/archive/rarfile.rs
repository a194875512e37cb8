//! RAR extraction via the bundled unrar library.

use std::fs;
use std::path::Path;

use unrar::Archive;

use super::sanitize_entry_path;
use crate::error::ArchiveError;

pub(super) fn extract_rar(source: &Path, target: &Path) -> Result<(), ArchiveError> {
    let mut archive = Archive::new(source)
        .open_for_processing()
        .map_err(|e| extraction(source, e))?;

    while let Some(header) = archive.read_header().map_err(|e| extraction(source, e))? {
        let entry = header.entry();
        let entry_path = sanitize_entry_path(&entry.filename.to_string_lossy())?;

        archive = if entry.is_file() && !entry_path.as_os_str().is_empty() {
            let destination = target.join(&entry_path);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
            }
            header
                .extract_to(&destination)
                .map_err(|e| extraction(source, e))?
        } else {
            if entry.is_directory() && !entry_path.as_os_str().is_empty() {
                let destination = target.join(&entry_path);
                fs::create_dir_all(&destination)
                    .map_err(|e| ArchiveError::io(&destination, e))?;
            }
            header.skip().map_err(|e| extraction(source, e))?
        };
    }

    Ok(())
}

fn extraction(source: &Path, err: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::Extraction {
        path: source.to_path_buf(),
        message: err.to_string(),
    }
}
