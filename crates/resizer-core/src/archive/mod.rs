//! Archive format detection, extraction, and result packaging.
//!
//! Formats are detected from content signatures, never from the file name.
//! Entry paths are sanitized so nothing can be written outside the
//! destination directory.

mod package;
#[cfg(feature = "rar")]
mod rarfile;
mod zipfile;

pub use package::{package_dir, result_archive_name};

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use crate::error::ArchiveError;

/// Archive containers the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Rar,
}

impl ArchiveKind {
    /// Identify an archive from its leading bytes. ZIP is checked first.
    pub fn detect(path: &Path) -> Result<Option<Self>, ArchiveError> {
        let mut file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
        let mut header = [0u8; 8];
        let mut filled = 0;
        while filled < header.len() {
            let n = file
                .read(&mut header[filled..])
                .map_err(|e| ArchiveError::io(path, e))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(Self::from_header(&header[..filled]))
    }

    fn from_header(header: &[u8]) -> Option<Self> {
        // Local file header, empty archive (end of central directory), spanned marker.
        const ZIP_SIGNATURES: [&[u8]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];
        // RAR 1.5-4.x and RAR 5.0.
        const RAR_SIGNATURES: [&[u8]; 2] = [b"Rar!\x1a\x07\x00", b"Rar!\x1a\x07\x01\x00"];

        if ZIP_SIGNATURES.iter().any(|sig| header.starts_with(sig)) {
            Some(Self::Zip)
        } else if RAR_SIGNATURES.iter().any(|sig| header.starts_with(sig)) {
            Some(Self::Rar)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Rar => "rar",
        }
    }
}

/// Extract `archive` into `destination`, preserving relative paths.
///
/// Unrecognized signatures fail before anything is written. Returns the
/// detected kind on success.
pub fn extract(archive: &Path, destination: &Path) -> Result<ArchiveKind, ArchiveError> {
    let kind = ArchiveKind::detect(archive)?.ok_or_else(|| ArchiveError::UnsupportedFormat {
        path: archive.to_path_buf(),
    })?;

    std::fs::create_dir_all(destination).map_err(|e| ArchiveError::io(destination, e))?;

    match kind {
        ArchiveKind::Zip => zipfile::extract_zip(archive, destination)?,
        ArchiveKind::Rar => extract_rar(archive, destination)?,
    }

    tracing::info!("Extracted {:?} as {}", archive, kind.as_str());
    Ok(kind)
}

#[cfg(feature = "rar")]
fn extract_rar(archive: &Path, destination: &Path) -> Result<(), ArchiveError> {
    rarfile::extract_rar(archive, destination)
}

#[cfg(not(feature = "rar"))]
fn extract_rar(archive: &Path, _destination: &Path) -> Result<(), ArchiveError> {
    tracing::warn!("RAR support not compiled in; rejecting {:?}", archive);
    Err(ArchiveError::UnsupportedFormat {
        path: archive.to_path_buf(),
    })
}

/// Normalize an archive entry name into a safe relative path.
///
/// Absolute paths and parent-directory segments are rejected; `.` segments
/// are dropped. Backslashes are treated as separators since archives built
/// on Windows use them.
pub(crate) fn sanitize_entry_path(entry: &str) -> Result<PathBuf, ArchiveError> {
    let normalized = entry.replace('\\', "/");
    let path = Path::new(&normalized);
    if path.is_absolute() || normalized.starts_with('/') {
        return Err(ArchiveError::UnsafeEntry {
            entry: entry.to_string(),
        });
    }

    let mut sanitized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => sanitized.push(segment),
            Component::CurDir => {}
            _ => {
                return Err(ArchiveError::UnsafeEntry {
                    entry: entry.to_string(),
                });
            }
        }
    }

    Ok(sanitized)
}
