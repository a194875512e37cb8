//! Core data types for jobs and their outcomes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{JobError, PipelineError};

/// Canvas size and aspect-ratio window applied to every image of a job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformParams {
    /// Canvas width in pixels
    pub width: u32,

    /// Canvas height in pixels
    pub height: u32,

    /// Accepted deviation of width/height from 1.0, as a fraction
    pub tolerance: f64,
}

impl TransformParams {
    pub fn new(width: u32, height: u32, tolerance: f64) -> Self {
        Self {
            width,
            height,
            tolerance,
        }
    }

    /// Build parameters from the configured canvas and tolerance.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.canvas.width,
            config.canvas.height,
            config.filter.aspect_ratio_tolerance,
        )
    }

    /// Reject zero-sized canvases and tolerances outside `[0, 1)`.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.width == 0 || self.height == 0 {
            return Err(JobError::InvalidRequest(format!(
                "canvas must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if !(0.0..1.0).contains(&self.tolerance) {
            return Err(JobError::InvalidRequest(format!(
                "tolerance must be in [0, 1), got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// A request to process one archive. Consumed once by the orchestrator.
///
/// The archive file is moved into the job's working area and deleted with it.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Archive to extract (ZIP or RAR, detected by content)
    pub archive: PathBuf,

    /// Canvas and tolerance
    pub params: TransformParams,

    /// Identity recorded in the unique-user statistic
    pub requester: Option<String>,
}

impl JobRequest {
    pub fn new(archive: impl Into<PathBuf>, params: TransformParams) -> Self {
        Self {
            archive: archive.into(),
            params,
            requester: None,
        }
    }

    pub fn with_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }
}

/// A request to process loose images, each delivered back individually.
#[derive(Debug, Clone)]
pub struct ImageBatchRequest {
    pub requester: String,
    pub images: Vec<PathBuf>,
    pub params: TransformParams,
}

/// Why an image that decoded fine was left out of the output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// width/height fell outside the accepted window
    AspectRatio { ratio: f64 },
}

/// Result of classifying and transforming one eligible file.
#[derive(Debug)]
pub enum FileOutcome {
    /// The padded JPEG was written to `output`
    Transformed { output: PathBuf },
    /// Expected classification outcome, counted as an error
    Rejected(RejectReason),
    /// Decode, encode, or write failure
    Failed(PipelineError),
}

/// Aggregated counts from one walk of an extracted tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Images written to the output directory
    pub success_count: u64,

    /// Eligible files that produced no output
    pub error_count: u64,

    /// Part of `error_count` rejected by the aspect-ratio gate
    pub aspect_rejections: u64,

    /// Part of `error_count` that failed to decode, encode, or write
    pub failures: u64,

    /// Output files in walk order
    pub outputs: Vec<PathBuf>,
}

impl BatchReport {
    /// Fold one file's outcome into the counts.
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Transformed { output } => {
                self.success_count += 1;
                self.outputs.push(output);
            }
            FileOutcome::Rejected(_) => {
                self.error_count += 1;
                self.aspect_rejections += 1;
            }
            FileOutcome::Failed(_) => {
                self.error_count += 1;
                self.failures += 1;
            }
        }
    }

    /// Number of filename-eligible entries that were considered.
    pub fn considered(&self) -> u64 {
        self.success_count + self.error_count
    }
}

/// Result of a completed archive job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Identifier of the job's working area
    pub job_id: Uuid,

    pub success_count: u64,
    pub error_count: u64,
    pub aspect_rejections: u64,
    pub failures: u64,

    /// Time from acceptance to just before cleanup
    pub elapsed: Duration,

    /// Result archive, present iff `success_count > 0`
    pub output_archive: Option<PathBuf>,

    /// Size of the input archive in bytes
    pub archive_size: u64,
}

/// Wire-format status returned by [`crate::Pipeline::process`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStatus {
    pub success: u64,
    pub errors: u64,
    /// Elapsed seconds
    pub time: f64,
    pub processed_archive: Option<String>,
    pub archive_size: u64,
}

impl ProcessStatus {
    /// Status reported for a job that failed before producing counts.
    pub fn failed(elapsed: Duration) -> Self {
        Self {
            success: 0,
            errors: 0,
            time: elapsed.as_secs_f64(),
            processed_archive: None,
            archive_size: 0,
        }
    }
}

impl From<&JobOutcome> for ProcessStatus {
    fn from(outcome: &JobOutcome) -> Self {
        Self {
            success: outcome.success_count,
            errors: outcome.error_count,
            time: outcome.elapsed.as_secs_f64(),
            processed_archive: outcome
                .output_archive
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            archive_size: outcome.archive_size,
        }
    }
}

/// Per-batch counts for a loose-image request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBatchSummary {
    /// Images transformed and handed to the delivery collaborator
    pub delivered: u64,
    /// Images outside the aspect-ratio window
    pub rejected: u64,
    /// Missing files or decode/encode/delivery failures
    pub failed: u64,
}
