//! The `resizer process` command for archive jobs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use resizer_core::{
    Config, Delivery, DispatchError, JobDispatcher, JobHandle, JobOutcome, JobRequest, Pipeline,
    ProcessStatus,
};
use serde::Serialize;

use super::{configured_delivery, CanvasArgs, Staging};

/// Arguments for the `process` command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// ZIP or RAR archives to process
    #[arg(required = true)]
    pub archives: Vec<PathBuf>,

    #[command(flatten)]
    pub canvas: CanvasArgs,

    /// Requester identity recorded in the statistics; also the chat id
    /// result archives are delivered to
    #[arg(short, long)]
    pub user: Option<String>,

    /// Also copy result archives into this directory instead of sending
    /// them through the bot API
    #[arg(long, requires = "user")]
    pub deliver_to: Option<PathBuf>,

    /// Seconds to wait for each result (defaults to dispatch.result_timeout_secs)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Number of archives processed concurrently (defaults to dispatch.workers)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Hand the archives to the pipeline directly; they are deleted afterwards
    #[arg(long)]
    pub consume: bool,
}

/// One line of output per archive.
#[derive(Debug, Serialize)]
struct ArchiveReport<'a> {
    archive: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ProcessStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    delivered: bool,
}

#[derive(Debug, Default)]
struct Tally {
    succeeded: u64,
    empty: u64,
    failed: u64,
    timed_out: u64,
    resized: u64,
    skipped: u64,
}

/// Execute the process command.
pub async fn execute(args: ProcessArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let params = args.canvas.resolve(&config);
    params.validate()?;

    let workers = args.parallel.unwrap_or(config.dispatch.workers);
    let timeout = Duration::from_secs(
        args.timeout_secs
            .unwrap_or(config.dispatch.result_timeout_secs),
    );
    let max_bytes = config.limits.max_archive_bytes();
    let delivery = match &args.user {
        Some(_) => configured_delivery(&config, args.deliver_to.clone())?,
        None => None,
    };

    let pipeline = Arc::new(Pipeline::from_config(&config));
    let dispatcher = JobDispatcher::new(pipeline, workers);
    let mut staging = if args.consume {
        None
    } else {
        Some(Staging::new(&config.work_dir())?)
    };

    let start_time = Instant::now();
    let mut tally = Tally::default();
    let mut submitted: Vec<(&Path, JobHandle)> = Vec::new();

    for archive in &args.archives {
        if let Err(e) = check_size(archive, max_bytes) {
            tracing::error!("Rejected {:?}: {}", archive, e);
            emit(&ArchiveReport {
                archive,
                status: None,
                error: Some(e.to_string()),
                delivered: false,
            })?;
            tally.failed += 1;
            continue;
        }

        let input = match staging.as_mut() {
            Some(staging) => staging.stage(archive)?,
            None => archive.clone(),
        };
        let mut request = JobRequest::new(input, params);
        if let Some(user) = &args.user {
            request = request.with_requester(user.clone());
        }
        submitted.push((archive.as_path(), dispatcher.submit(request)));
    }

    if submitted.is_empty() {
        print_summary(&tally, start_time.elapsed());
        return Ok(());
    }
    tracing::info!(
        "Submitted {} archive(s) to {} worker(s)",
        submitted.len(),
        dispatcher.workers()
    );

    let progress = create_progress_bar(submitted.len() as u64)?;
    for (archive, mut handle) in submitted {
        let report = match handle.wait(timeout).await {
            Ok(outcome) => {
                tally.resized += outcome.success_count;
                tally.skipped += outcome.error_count;
                if outcome.output_archive.is_some() {
                    tally.succeeded += 1;
                } else {
                    tally.empty += 1;
                    tracing::warn!("No valid images found in {:?}", archive);
                }
                let delivered = match (&delivery, &args.user) {
                    (Some(delivery), Some(user)) => {
                        deliver_archive(delivery.as_ref(), user, &outcome).await
                    }
                    _ => false,
                };
                ArchiveReport {
                    archive,
                    status: Some(ProcessStatus::from(&outcome)),
                    error: None,
                    delivered,
                }
            }
            Err(e) => {
                match &e {
                    DispatchError::Timeout { .. } => {
                        tally.timed_out += 1;
                        tracing::warn!(
                            "Gave up waiting for {:?}; job {} keeps running",
                            archive,
                            handle.job_id()
                        );
                    }
                    _ => {
                        tally.failed += 1;
                        tracing::error!("Failed: {:?} - {}", archive, e);
                    }
                }
                ArchiveReport {
                    archive,
                    status: None,
                    error: Some(e.to_string()),
                    delivered: false,
                }
            }
        };
        progress.suspend(|| emit(&report))?;
        progress.inc(1);
    }
    progress.finish_and_clear();

    print_summary(&tally, start_time.elapsed());
    Ok(())
}

/// Archives above the configured limit are refused before submission.
fn check_size(archive: &Path, max_bytes: u64) -> anyhow::Result<()> {
    let metadata = std::fs::metadata(archive)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", archive.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("{} is not a file", archive.display());
    }
    if metadata.len() > max_bytes {
        anyhow::bail!(
            "archive exceeds the {} MB size limit ({} bytes)",
            max_bytes / (1024 * 1024),
            metadata.len()
        );
    }
    Ok(())
}

/// Send a finished job's result archive back to the requester.
async fn deliver_archive(delivery: &dyn Delivery, requester: &str, outcome: &JobOutcome) -> bool {
    let Some(path) = &outcome.output_archive else {
        return false;
    };
    match delivery.send_archive(requester, path, outcome).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Failed to deliver {:?} to {}: {}", path, requester, e);
            false
        }
    }
}

fn emit(report: &ArchiveReport<'_>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(report)?);
    Ok(())
}

/// Create a progress bar for waiting on submitted archives.
fn create_progress_bar(total: u64) -> anyhow::Result<indicatif::ProgressBar> {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )?
            .progress_chars("##-"),
    );
    pb.set_message("processing...");
    Ok(pb)
}

/// Print a formatted summary table.
fn print_summary(tally: &Tally, elapsed: Duration) {
    let total = tally.succeeded + tally.empty + tally.failed + tally.timed_out;

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Archives:     {:>8}", tally.succeeded);
    if tally.empty > 0 {
        eprintln!("    No images:    {:>8}", tally.empty);
    }
    if tally.failed > 0 {
        eprintln!("    Failed:       {:>8}", tally.failed);
    }
    if tally.timed_out > 0 {
        eprintln!("    Timed out:    {:>8}", tally.timed_out);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", total);
    eprintln!("    Resized:      {:>8}", tally.resized);
    eprintln!("    Skipped:      {:>8}", tally.skipped);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("  ====================================");
}
