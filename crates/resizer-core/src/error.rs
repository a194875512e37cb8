//! Error types for the resize pipeline.
//!
//! Errors are organized by stage. Only archive-level failures are fatal to a
//! job; per-image errors are absorbed by the batch walker and surface as
//! counts.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Archive errors. Every variant is fatal to the job that raised it.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Content signature is neither ZIP nor RAR
    #[error("Unsupported archive format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Archive was recognized but could not be extracted
    #[error("Extraction failed for {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    /// Entry path would escape the destination directory
    #[error("Unsafe archive entry: {entry}")]
    UnsafeEntry { entry: String },

    /// Building the result archive failed
    #[error("Packaging failed for {path}: {message}")]
    Packaging { path: PathBuf, message: String },

    /// Filesystem error while reading or writing archive contents
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Per-image errors. Isolated to one file; never abort a batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// JPEG encoding failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// Writing the output file failed
    #[error("Write error for {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Statistics store errors.
#[derive(Error, Debug)]
pub enum StatsError {
    /// Reading or writing the record failed
    #[error("Statistics IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record on disk is not valid JSON for the expected schema
    #[error("Statistics record at {path} is malformed: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Acquiring the advisory lock failed
    #[error("Failed to lock {path}: {message}")]
    Lock { path: PathBuf, message: String },
}

/// Fatal job failures returned by the orchestrator.
#[derive(Error, Debug)]
pub enum JobError {
    /// Request parameters are out of range
    #[error("Invalid job request: {0}")]
    InvalidRequest(String),

    /// The working area could not be created or populated
    #[error("Working area error: {0}")]
    WorkingArea(#[source] std::io::Error),

    /// Unsupported format or extraction failure
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl JobError {
    /// Whether the failure was an unrecognized archive signature.
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, Self::Archive(ArchiveError::UnsupportedFormat { .. }))
    }
}

/// Errors observed by a caller waiting on a dispatched job.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The bounded wait expired; the job keeps running
    #[error("Timed out after {timeout_ms}ms waiting for job result")]
    Timeout { timeout_ms: u64 },

    /// The job itself failed
    #[error("Job failed: {0}")]
    Job(#[from] JobError),

    /// The worker went away without reporting a result
    #[error("Worker exited without a result: {0}")]
    WorkerLost(String),
}

/// Outbound delivery errors.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Remote endpoint failure or transport error
    #[error("Delivery failed: {message}")]
    Http {
        message: String,
        status_code: Option<u16>,
    },

    /// Reading the file to deliver failed
    #[error("Delivery IO error: {0}")]
    Io(#[from] std::io::Error),
}
