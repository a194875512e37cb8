//! The persisted statistics record and the per-job delta applied to it.

use serde::{Deserialize, Serialize};

/// Number of largest archives kept in the record.
pub const TOP_ARCHIVES: usize = 3;

/// One of the largest processed archives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopArchive {
    /// Result archive file name
    pub filename: String,
    /// Input archive size in bytes
    pub size: u64,
    /// Processing time in seconds
    pub time: f64,
}

/// Aggregate usage statistics, stored as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsRecord {
    /// Unique requester identities, in first-seen order
    pub users: Vec<String>,
    /// Archive jobs completed
    pub archives: u64,
    /// Filename-eligible images considered
    pub images: u64,
    /// Images successfully resized
    pub resizes: u64,
    /// Largest archives by size, descending
    pub top_archives: Vec<TopArchive>,
}

/// What one finished job adds to the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobDelta {
    /// Whether the job was an archive job (counts toward `archives`)
    pub archive_job: bool,
    pub images_considered: u64,
    pub images_resized: u64,
    /// Candidate for the top-N list
    pub top_entry: Option<TopArchive>,
}

impl StatsRecord {
    /// Fold a job into the record. Idempotent on the user set only.
    pub fn apply(&mut self, requester: Option<&str>, delta: &JobDelta) {
        if let Some(user) = requester {
            if !self.users.iter().any(|u| u == user) {
                self.users.push(user.to_string());
            }
        }
        if delta.archive_job {
            self.archives += 1;
        }
        self.images += delta.images_considered;
        self.resizes += delta.images_resized;

        if let Some(entry) = &delta.top_entry {
            self.top_archives.push(entry.clone());
            self.top_archives.sort_by(|a, b| b.size.cmp(&a.size));
            self.top_archives.truncate(TOP_ARCHIVES);
        }
    }

    /// Number of distinct requesters seen.
    pub fn unique_users(&self) -> usize {
        self.users.len()
    }
}

/// Round seconds to two decimals for the top-N list.
pub fn round_seconds(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}
