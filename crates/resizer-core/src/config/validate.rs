//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.width == 0 {
            return Err(ConfigError::ValidationError(
                "canvas.width must be > 0".into(),
            ));
        }
        if self.canvas.height == 0 {
            return Err(ConfigError::ValidationError(
                "canvas.height must be > 0".into(),
            ));
        }
        let tolerance = self.filter.aspect_ratio_tolerance;
        if !(0.0..1.0).contains(&tolerance) {
            return Err(ConfigError::ValidationError(
                "filter.aspect_ratio_tolerance must be in [0.0, 1.0)".into(),
            ));
        }
        if self.filter.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "filter.supported_formats must not be empty".into(),
            ));
        }
        if self.limits.max_archive_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_archive_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.dispatch.workers == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.workers must be > 0".into(),
            ));
        }
        if self.dispatch.result_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.result_timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}
