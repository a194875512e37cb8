//! Result packaging: zips a populated output directory.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::ArchiveError;

/// Deterministic result archive name: `processed_<timestamp>_<job>_<stem>.zip`.
///
/// The job id prefix keeps concurrent jobs on the same input name apart.
pub fn result_archive_name(original: &Path, job_id: &uuid::Uuid) -> String {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "archive".to_string());
    let short_id = job_id.simple().to_string();
    format!(
        "processed_{}_{}_{}.zip",
        chrono::Utc::now().timestamp(),
        &short_id[..8],
        stem
    )
}

/// Write every file under `source_dir` into a new ZIP at `destination`,
/// using paths relative to `source_dir`. Returns the number of entries.
pub fn package_dir(source_dir: &Path, destination: &Path) -> Result<usize, ArchiveError> {
    let file = File::create(destination).map_err(|e| ArchiveError::io(destination, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut written = 0usize;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| packaging(destination, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| packaging(destination, e))?;
        let name = entry_name(relative);

        zip.start_file(name, options)
            .map_err(|e| packaging(destination, e))?;
        let mut input = File::open(entry.path()).map_err(|e| ArchiveError::io(entry.path(), e))?;
        io::copy(&mut input, &mut zip).map_err(|e| packaging(destination, e))?;
        written += 1;
    }

    zip.finish().map_err(|e| packaging(destination, e))?;
    tracing::debug!("Packaged {} file(s) into {:?}", written, destination);
    Ok(written)
}

/// ZIP entry names always use forward slashes.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn packaging(path: &Path, err: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::Packaging {
        path: PathBuf::from(path),
        message: err.to_string(),
    }
}
