//! Resizer Core - archive ingestion and pad-to-canvas image normalization.
//!
//! Takes a ZIP or RAR archive of images, pads every image whose aspect ratio
//! is close enough to square onto a fixed white canvas, and packages the
//! results into a new ZIP archive.
//!
//! # Architecture
//!
//! Each job runs strictly in sequence inside its own working area:
//!
//! ```text
//! Archive → Detect → Extract → Walk (decode → aspect gate → pad → JPEG) → Package → Stats
//! ```
//!
//! Jobs are independent; the statistics store is the only shared resource
//! and is guarded by a cross-process file lock.
//!
//! # Usage
//!
//! ```rust,ignore
//! use resizer_core::{Config, JobRequest, Pipeline, TransformParams};
//!
//! let config = Config::load()?;
//! let pipeline = Pipeline::from_config(&config);
//! let request = JobRequest::new("./photos.zip", TransformParams::from_config(&config))
//!     .with_requester("42");
//! let outcome = pipeline.run(request)?;
//! println!("{} resized, archive: {:?}", outcome.success_count, outcome.output_archive);
//! ```

// Module declarations
pub mod archive;
pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod stats;
pub mod types;
pub mod workspace;

// Re-exports for convenient access
pub use config::Config;
pub use delivery::{Delivery, HttpDelivery, ImageNotice, ImageReceipt, LocalDelivery};
pub use dispatch::{JobDispatcher, JobHandle};
pub use error::{
    ArchiveError, ConfigError, DeliveryError, DispatchError, JobError, PipelineError, StatsError,
};
pub use job::{JobStage, Pipeline};
pub use pipeline::ImageProcessor;
pub use stats::{StatsRecord, StatsStore};
pub use types::{
    BatchReport, FileOutcome, ImageBatchRequest, ImageBatchSummary, JobOutcome, JobRequest,
    ProcessStatus, RejectReason, TransformParams,
};
pub use workspace::WorkingArea;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_pipeline_from_default_config() {
        let config = Config::default();
        let pipeline = Pipeline::from_config(&config);
        assert_eq!(pipeline.config().canvas.width, 900);
        assert_eq!(pipeline.config().canvas.height, 1200);
        assert_eq!(pipeline.stats().unwrap().path(), config.stats_file());
    }
}
