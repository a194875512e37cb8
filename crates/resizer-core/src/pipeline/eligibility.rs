//! Name-based eligibility pre-filter.
//!
//! Ineligible entries are not images at all: they never reach the decoder
//! and are excluded from both success and error counts.

use std::ffi::OsStr;
use std::path::{Component, Path};

use crate::config::FilterConfig;

/// Decides from a path alone whether a file should be treated as an image.
#[derive(Debug, Clone)]
pub struct Eligibility {
    extensions: Vec<String>,
    ignored_dirs: Vec<String>,
}

impl Eligibility {
    /// Create a filter from the configured formats and ignored directories.
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            extensions: config
                .supported_formats
                .iter()
                .map(|f| f.trim_start_matches('.').to_lowercase())
                .collect(),
            ignored_dirs: config.ignored_dirs.clone(),
        }
    }

    /// Check a path relative to the walk root.
    pub fn is_eligible(&self, relative: &Path) -> bool {
        let Some(name) = relative.file_name().and_then(OsStr::to_str) else {
            return false;
        };
        if name.starts_with('.') {
            return false;
        }
        if self.in_ignored_dir(relative) {
            return false;
        }
        self.has_supported_extension(relative)
    }

    fn in_ignored_dir(&self, relative: &Path) -> bool {
        let Some(parent) = relative.parent() else {
            return false;
        };
        parent.components().any(|component| match component {
            Component::Normal(segment) => segment
                .to_str()
                .map(|s| self.ignored_dirs.iter().any(|dir| dir == s))
                .unwrap_or(false),
            _ => false,
        })
    }

    fn has_supported_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.extensions.iter().any(|fmt| *fmt == ext_lower)
            })
            .unwrap_or(false)
    }
}
