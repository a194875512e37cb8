//! Configuration management for the resizer.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. A handful of deployment knobs can be overridden from the
//! environment.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target canvas
    pub canvas: CanvasConfig,

    /// Eligibility and aspect-ratio filtering
    pub filter: FilterConfig,

    /// Working, output, and statistics locations
    pub paths: PathsConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Worker pool settings
    pub dispatch: DispatchConfig,

    /// Outbound delivery settings
    pub delivery: DeliveryConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist. Environment
    /// overrides are applied in both cases.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::read(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply environment
    /// overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::load_from_with(path, |key| std::env::var(key).ok())
    }

    fn load_from_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::read(path)?;
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories, falling back to
    /// `~/.resizer/config.toml` if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "resizer", "resizer")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".resizer").join("config.toml")
            })
    }

    /// Apply `RESIZER_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("RESIZER_CANVAS_WIDTH") {
            self.canvas.width = parse_override("RESIZER_CANVAS_WIDTH", &value)?;
        }
        if let Some(value) = lookup("RESIZER_CANVAS_HEIGHT") {
            self.canvas.height = parse_override("RESIZER_CANVAS_HEIGHT", &value)?;
        }
        if let Some(value) = lookup("RESIZER_ASPECT_RATIO_TOLERANCE") {
            self.filter.aspect_ratio_tolerance =
                parse_override("RESIZER_ASPECT_RATIO_TOLERANCE", &value)?;
        }
        if let Some(value) = lookup("RESIZER_WORK_DIR") {
            self.paths.work_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("RESIZER_STATS_FILE") {
            self.paths.stats_file = PathBuf::from(value);
        }
        Ok(())
    }

    /// Resolved working-area root (with ~ expansion).
    pub fn work_dir(&self) -> PathBuf {
        expand(&self.paths.work_dir)
    }

    /// Resolved directory that finished result archives are moved into.
    pub fn output_dir(&self) -> PathBuf {
        expand(&self.paths.output_dir)
    }

    /// Resolved statistics record path.
    pub fn stats_file(&self) -> PathBuf {
        expand(&self.paths.stats_file)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} has invalid value '{value}'")))
}
