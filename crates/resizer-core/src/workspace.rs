//! Job-scoped working areas.
//!
//! A working area is a UUID-named directory holding the adopted input
//! archive, `extracted/`, and `processed/`. It is removed when the guard is
//! dropped, so no exit path of a job can leak it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

const EXTRACTED_DIR: &str = "extracted";
const PROCESSED_DIR: &str = "processed";

/// Exclusive scratch space for one job.
#[derive(Debug)]
pub struct WorkingArea {
    id: Uuid,
    dir: TempDir,
}

impl WorkingArea {
    /// Create `<base>/<uuid>/{extracted,processed}`.
    pub fn create(base: &Path) -> io::Result<Self> {
        fs::create_dir_all(base)?;
        let id = Uuid::new_v4();
        let dir = tempfile::Builder::new()
            .prefix(&id.to_string())
            .rand_bytes(0)
            .tempdir_in(base)?;
        fs::create_dir(dir.path().join(EXTRACTED_DIR))?;
        fs::create_dir(dir.path().join(PROCESSED_DIR))?;
        tracing::debug!("Created working area {:?}", dir.path());
        Ok(Self { id, dir })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn extracted_dir(&self) -> PathBuf {
        self.root().join(EXTRACTED_DIR)
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root().join(PROCESSED_DIR)
    }

    /// Move `source` into the area so its lifetime is bound to the job.
    pub fn adopt(&self, source: &Path) -> io::Result<PathBuf> {
        let name = source
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"))?;
        let target = self.root().join(name);
        move_file(source, &target)?;
        Ok(target)
    }

    /// Move a finished file out of the area into `dest_dir`.
    pub fn promote(&self, file: &Path, dest_dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dest_dir)?;
        let name = file
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "file has no name"))?;
        let target = dest_dir.join(name);
        move_file(file, &target)?;
        Ok(target)
    }

    /// Delete the area now, reporting failures instead of swallowing them.
    pub fn close(self) -> io::Result<()> {
        let path = self.root().to_path_buf();
        self.dir.close()?;
        tracing::debug!("Removed working area {:?}", path);
        Ok(())
    }
}

/// Rename, falling back to copy + remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
