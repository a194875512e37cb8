//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Target canvas every accepted image is padded onto.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Canvas width in pixels
    pub width: u32,

    /// Canvas height in pixels
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 900,
            height: 1200,
        }
    }
}

/// Eligibility pre-filter and aspect-ratio gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Accepted window around a square ratio, as a fraction
    pub aspect_ratio_tolerance: f64,

    /// Raster extensions considered images
    pub supported_formats: Vec<String>,

    /// Directory names whose contents are never images (resource forks etc.)
    pub ignored_dirs: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            aspect_ratio_tolerance: 0.15,
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "gif".to_string(),
            ],
            ignored_dirs: vec!["__MACOSX".to_string()],
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root under which per-job working areas are created
    pub work_dir: PathBuf,

    /// Where finished result archives are moved before cleanup
    pub output_dir: PathBuf,

    /// Persisted statistics record
    pub stats_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("~/.resizer/work"),
            output_dir: PathBuf::from("~/.resizer/outgoing"),
            stats_file: PathBuf::from("~/.resizer/stats/stats.json"),
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted input archive, checked by the front-end
    pub max_archive_size_mb: u64,

    /// Largest single image file the decoder will open
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_archive_size_mb: 20,
            max_file_size_mb: 50,
            max_image_dimension: 20000,
        }
    }
}

const MIB: u64 = 1024 * 1024;

impl LimitsConfig {
    /// Archive limit in bytes, saturating at `u64::MAX`.
    pub fn max_archive_bytes(&self) -> u64 {
        self.max_archive_size_mb.saturating_mul(MIB)
    }

    /// Per-image file limit in bytes, saturating at `u64::MAX`.
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(MIB)
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Jobs allowed to run at once
    pub workers: usize,

    /// How long a caller waits for a job result
    pub result_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            result_timeout_secs: 60,
        }
    }
}

/// Outbound delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Bot API base URL
    pub api_base: String,

    /// Bot token (supports ${ENV_VAR} syntax)
    pub token: String,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            token: "${BOT_TOKEN}".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
