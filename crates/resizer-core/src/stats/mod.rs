//! Persistent usage statistics shared by every job.
//!
//! Updates are serialized across threads and processes with an exclusive
//! `flock` on `<stats_file>.lock`, held for the whole load-modify-save.
//! Saves go through a temp file and a rename so the record on disk is
//! always complete.

mod record;

pub use record::{round_seconds, JobDelta, StatsRecord, TopArchive, TOP_ARCHIVES};

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};

use crate::error::StatsError;

/// File-backed statistics store.
#[derive(Debug, Clone)]
pub struct StatsStore {
    path: PathBuf,
}

impl StatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        sibling(&self.path, "lock")
    }

    fn tmp_path(&self) -> PathBuf {
        sibling(&self.path, "tmp")
    }

    /// Apply one job's delta atomically and return the updated record.
    pub fn record(
        &self,
        requester: Option<&str>,
        delta: &JobDelta,
    ) -> Result<StatsRecord, StatsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(parent, e))?;
        }

        let _guard = self.lock()?;
        let mut record = self.load()?;
        record.apply(requester, delta);
        self.save(&record)?;

        tracing::debug!(
            "Statistics updated: archives={}, images={}, resizes={}",
            record.archives,
            record.images,
            record.resizes
        );
        Ok(record)
    }

    /// Read the current record without locking. A missing file yields the
    /// empty record.
    pub fn snapshot(&self) -> Result<StatsRecord, StatsError> {
        self.load()
    }

    fn lock(&self) -> Result<Flock<File>, StatsError> {
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| self.io_err(&lock_path, e))?;

        Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| StatsError::Lock {
            path: lock_path,
            message: errno.desc().to_string(),
        })
    }

    fn load(&self) -> Result<StatsRecord, StatsError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StatsRecord::default()),
            Err(e) => return Err(self.io_err(&self.path, e)),
        };
        if content.trim().is_empty() {
            return Ok(StatsRecord::default());
        }
        serde_json::from_str(&content).map_err(|source| StatsError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, record: &StatsRecord) -> Result<(), StatsError> {
        let tmp = self.tmp_path();
        let json = serde_json::to_string_pretty(record).map_err(|source| StatsError::Json {
            path: self.path.clone(),
            source,
        })?;

        let mut file = File::create(&tmp).map_err(|e| self.io_err(&tmp, e))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| self.io_err(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(&self.path, e))
    }

    fn io_err(&self, path: &Path, source: io::Error) -> StatsError {
        StatsError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// `stats.json` -> `stats.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
