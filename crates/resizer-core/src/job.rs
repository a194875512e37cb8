//! Job orchestration: extract, transform, package, record, clean up.
//!
//! Stages run strictly in order inside one blocking call. The working area
//! is a drop guard, so it is removed on every exit path including early
//! returns and panics.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::archive::{self, ArchiveKind};
use crate::config::Config;
use crate::delivery::{Delivery, ImageNotice, ImageReceipt};
use crate::error::{ArchiveError, JobError};
use crate::pipeline::{BatchWalker, ImageProcessor};
use crate::stats::{round_seconds, JobDelta, StatsStore, TopArchive};
use crate::types::{
    BatchReport, FileOutcome, ImageBatchRequest, ImageBatchSummary, JobOutcome, JobRequest,
    ProcessStatus, RejectReason, TransformParams,
};
use crate::workspace::WorkingArea;

/// Lifecycle of an archive job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Created,
    Extracting,
    Transforming,
    Packaging,
    StatsUpdating,
    CleaningUp,
    Done,
    Failed,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Extracting => "extracting",
            Self::Transforming => "transforming",
            Self::Packaging => "packaging",
            Self::StatsUpdating => "stats-updating",
            Self::CleaningUp => "cleaning-up",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn enter(job_id: Uuid, stage: JobStage) {
    tracing::debug!("Job {} -> {}", job_id, stage);
}

/// The archive resize pipeline.
///
/// Holds no per-job state; one instance can serve many concurrent jobs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
    stats: Option<StatsStore>,
}

impl Pipeline {
    /// Create a pipeline that does not record statistics.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            stats: None,
        }
    }

    /// Create a pipeline recording into the configured statistics file.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.clone()).with_stats(StatsStore::new(config.stats_file()))
    }

    pub fn with_stats(mut self, store: StatsStore) -> Self {
        self.stats = Some(store);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> Option<&StatsStore> {
        self.stats.as_ref()
    }

    /// Run one archive job to completion.
    ///
    /// The input archive is consumed. Only an invalid request, a working-area
    /// failure, or an archive-level failure is an error; an archive without
    /// usable images is a successful outcome with no output archive.
    pub fn run(&self, request: JobRequest) -> Result<JobOutcome, JobError> {
        let started = Instant::now();
        request.params.validate()?;

        let metadata = std::fs::metadata(&request.archive)
            .map_err(|e| ArchiveError::io(&request.archive, e))?;
        // The input is moved and later deleted, so it has to be a plain file.
        if !metadata.is_file() {
            return Err(JobError::InvalidRequest(format!(
                "{} is not a regular file",
                request.archive.display()
            )));
        }
        let archive_size = metadata.len();

        let area = WorkingArea::create(&self.config.work_dir()).map_err(JobError::WorkingArea)?;
        let job_id = area.id();
        enter(job_id, JobStage::Created);

        let result = self.run_in(&area, &request, archive_size, started);

        if let Err(e) = &result {
            tracing::warn!("Job {} failed: {}", job_id, e);
            enter(job_id, JobStage::Failed);
        }
        enter(job_id, JobStage::CleaningUp);
        if let Err(e) = area.close() {
            tracing::warn!("Failed to remove working area for job {}: {}", job_id, e);
        }

        let outcome = result?;
        enter(job_id, JobStage::Done);
        tracing::info!(
            "Job {} finished: {} resized, {} skipped in {:.2}s",
            job_id,
            outcome.success_count,
            outcome.error_count,
            outcome.elapsed.as_secs_f64()
        );
        Ok(outcome)
    }

    fn run_in(
        &self,
        area: &WorkingArea,
        request: &JobRequest,
        archive_size: u64,
        started: Instant,
    ) -> Result<JobOutcome, JobError> {
        let job_id = area.id();
        let source = area.adopt(&request.archive).map_err(JobError::WorkingArea)?;

        enter(job_id, JobStage::Extracting);
        let kind: ArchiveKind = archive::extract(&source, &area.extracted_dir())?;
        tracing::debug!("Job {} unpacked {} archive", job_id, kind.as_str());

        enter(job_id, JobStage::Transforming);
        let processor = ImageProcessor::new(&self.config, &request.params);
        let report = BatchWalker::new(&processor).walk(&area.extracted_dir(), &area.processed_dir());

        enter(job_id, JobStage::Packaging);
        let output_archive = if report.success_count > 0 {
            let name = archive::result_archive_name(&request.archive, &job_id);
            let staged = area.root().join(&name);
            archive::package_dir(&area.processed_dir(), &staged)?;
            let output_dir = self.config.output_dir();
            let promoted = area
                .promote(&staged, &output_dir)
                .map_err(|e| ArchiveError::io(&output_dir, e))?;
            Some(promoted)
        } else {
            None
        };
        let elapsed = started.elapsed();

        enter(job_id, JobStage::StatsUpdating);
        let top_entry = match (&output_archive, archive_size) {
            (Some(path), size) if size > 0 => Some(TopArchive {
                filename: file_name(path),
                size,
                time: round_seconds(elapsed.as_secs_f64()),
            }),
            _ => None,
        };
        self.record_stats(
            request.requester.as_deref(),
            &JobDelta {
                archive_job: true,
                images_considered: report.considered(),
                images_resized: report.success_count,
                top_entry,
            },
        );

        Ok(outcome(job_id, &report, elapsed, output_archive, archive_size))
    }

    /// Wire entry point: never fails, fatal errors map to a zeroed status.
    pub fn process(
        &self,
        archive_path: &Path,
        width: u32,
        height: u32,
        tolerance: f64,
    ) -> ProcessStatus {
        let started = Instant::now();
        let request = JobRequest::new(archive_path, TransformParams::new(width, height, tolerance));
        match self.run(request) {
            Ok(outcome) => ProcessStatus::from(&outcome),
            Err(e) => {
                if e.is_unsupported_format() {
                    tracing::info!("Rejected {:?}: {}", archive_path, e);
                }
                ProcessStatus::failed(started.elapsed())
            }
        }
    }

    /// Transform loose images one by one and deliver each result back.
    ///
    /// Outputs are written next to their source, delivered, then deleted.
    /// All originals are deleted once the batch is done. Loose images skip
    /// the extension pre-filter since chat uploads often lack one.
    pub async fn process_images(
        &self,
        request: ImageBatchRequest,
        delivery: &dyn Delivery,
    ) -> ImageBatchSummary {
        let mut summary = ImageBatchSummary::default();
        if let Err(e) = request.params.validate() {
            tracing::warn!("Rejected image batch from {}: {}", request.requester, e);
            summary.failed = request.images.len() as u64;
            return summary;
        }

        let processor = Arc::new(ImageProcessor::new(&self.config, &request.params));
        let requester = request.requester.as_str();
        let mut considered = 0u64;
        let mut resized = 0u64;

        for image in &request.images {
            let name = file_name(image);
            if !image.exists() {
                tracing::warn!("Image {:?} does not exist", image);
                self.notify(delivery, requester, &ImageNotice::NotFound { name })
                    .await;
                summary.failed += 1;
                continue;
            }
            considered += 1;

            let started = Instant::now();
            let output_dir = image.parent().map(Path::to_path_buf).unwrap_or_default();
            let source = image.clone();
            let worker = Arc::clone(&processor);
            let outcome =
                tokio::task::spawn_blocking(move || worker.process(&source, &output_dir)).await;

            match outcome {
                Ok(FileOutcome::Transformed { output }) => {
                    resized += 1;
                    let receipt = ImageReceipt {
                        file_name: file_name(&output),
                        elapsed: started.elapsed(),
                    };
                    match delivery.send_image(requester, &output, &receipt).await {
                        Ok(()) => summary.delivered += 1,
                        Err(e) => {
                            tracing::warn!("Failed to deliver {:?}: {}", output, e);
                            summary.failed += 1;
                        }
                    }
                    if let Err(e) = tokio::fs::remove_file(&output).await {
                        tracing::warn!("Failed to remove {:?}: {}", output, e);
                    }
                }
                Ok(FileOutcome::Rejected(RejectReason::AspectRatio { ratio })) => {
                    self.notify(delivery, requester, &ImageNotice::AspectRatio { name, ratio })
                        .await;
                    summary.rejected += 1;
                }
                Ok(FileOutcome::Failed(_)) => {
                    self.notify(delivery, requester, &ImageNotice::Failed { name })
                        .await;
                    summary.failed += 1;
                }
                Err(e) => {
                    tracing::warn!("Worker for {:?} panicked: {}", image, e);
                    self.notify(delivery, requester, &ImageNotice::Failed { name })
                        .await;
                    summary.failed += 1;
                }
            }
        }

        for image in &request.images {
            match tokio::fs::remove_file(image).await {
                Ok(()) => tracing::debug!("Removed original {:?}", image),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove original {:?}: {}", image, e),
            }
        }

        if let Some(store) = self.stats.clone() {
            let requester = request.requester.clone();
            let delta = JobDelta {
                archive_job: false,
                images_considered: considered,
                images_resized: resized,
                top_entry: None,
            };
            let recorded =
                tokio::task::spawn_blocking(move || store.record(Some(&requester), &delta)).await;
            match recorded {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!("Failed to record statistics: {}", e),
                Err(e) => tracing::warn!("Statistics task failed: {}", e),
            }
        }

        tracing::info!(
            "Image batch for {}: {} delivered, {} rejected, {} failed",
            requester,
            summary.delivered,
            summary.rejected,
            summary.failed
        );
        summary
    }

    async fn notify(&self, delivery: &dyn Delivery, requester: &str, notice: &ImageNotice) {
        if let Err(e) = delivery.report(requester, notice).await {
            tracing::warn!("Failed to report to {}: {}", requester, e);
        }
    }

    fn record_stats(&self, requester: Option<&str>, delta: &JobDelta) {
        let Some(store) = &self.stats else {
            return;
        };
        if let Err(e) = store.record(requester, delta) {
            tracing::warn!("Failed to record statistics: {}", e);
        }
    }
}

fn outcome(
    job_id: Uuid,
    report: &BatchReport,
    elapsed: std::time::Duration,
    output_archive: Option<std::path::PathBuf>,
    archive_size: u64,
) -> JobOutcome {
    JobOutcome {
        job_id,
        success_count: report.success_count,
        error_count: report.error_count,
        aspect_rejections: report.aspect_rejections,
        failures: report.failures,
        elapsed,
        output_archive,
        archive_size,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
