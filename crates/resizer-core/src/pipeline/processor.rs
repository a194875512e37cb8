//! Per-file classification: decode, aspect gate, pad, write.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::PipelineError;
use crate::types::{FileOutcome, TransformParams};

use super::decode::ImageDecoder;
use super::eligibility::Eligibility;
use super::transform::PadTransform;

/// Prefix of every transformed output file.
pub const OUTPUT_PREFIX: &str = "resized_";

/// Classifies single files and writes the padded result for accepted ones.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    decoder: ImageDecoder,
    eligibility: Eligibility,
    transform: PadTransform,
}

impl ImageProcessor {
    /// Create a processor for one job's parameters.
    pub fn new(config: &Config, params: &TransformParams) -> Self {
        Self {
            decoder: ImageDecoder::new(config.limits.clone()),
            eligibility: Eligibility::new(&config.filter),
            transform: PadTransform::new(params),
        }
    }

    /// Name-based pre-filter on a path relative to the walk root.
    pub fn is_eligible(&self, relative: &Path) -> bool {
        self.eligibility.is_eligible(relative)
    }

    /// Decode `source`, apply the aspect gate, and write the padded JPEG
    /// into `output_dir`.
    ///
    /// Never panics on bad input: every failure is folded into the outcome.
    pub fn process(&self, source: &Path, output_dir: &Path) -> FileOutcome {
        let decoded = match self.decoder.decode(source) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", source, e);
                return FileOutcome::Failed(e);
            }
        };

        let ratio = match self.transform.window().check(decoded.width, decoded.height) {
            Ok(ratio) => ratio,
            Err(reason) => {
                tracing::debug!(
                    "Rejected {:?}: {}x{} outside aspect window",
                    source,
                    decoded.width,
                    decoded.height
                );
                return FileOutcome::Rejected(reason);
            }
        };
        tracing::debug!(
            "Processing {:?} ({:?}) with aspect ratio {:.2}",
            source,
            decoded.format,
            ratio
        );

        let output = match output_path_for(source, output_dir) {
            Ok(path) => path,
            Err(e) => return FileOutcome::Failed(e),
        };
        let canvas = self.transform.pad(&decoded.image);
        match self.transform.write_jpeg(&canvas, &output) {
            Ok(()) => FileOutcome::Transformed { output },
            Err(e) => {
                tracing::warn!("Failed to write {:?}: {}", output, e);
                // Never leave a truncated JPEG in the output set.
                let _ = std::fs::remove_file(&output);
                FileOutcome::Failed(e)
            }
        }
    }
}

/// Pick a non-colliding `resized_<ts>_<stem>.jpg` path inside `output_dir`.
pub fn output_path_for(source: &Path, output_dir: &Path) -> Result<PathBuf, PipelineError> {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());
    let timestamp = chrono::Utc::now().timestamp();
    let base = format!("{OUTPUT_PREFIX}{timestamp}_{stem}");

    std::fs::create_dir_all(output_dir).map_err(|e| PipelineError::Write {
        path: output_dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut candidate = output_dir.join(format!("{base}.jpg"));
    let mut counter = 1u32;
    while candidate.exists() {
        candidate = output_dir.join(format!("{base}_{counter}.jpg"));
        counter += 1;
    }
    Ok(candidate)
}
