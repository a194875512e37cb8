//! Command implementations and the argument groups they share.

pub mod config;
pub mod images;
pub mod process;
pub mod stats;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Args;
use resizer_core::{Config, Delivery, HttpDelivery, LocalDelivery, TransformParams};

/// Canvas overrides; anything unset comes from the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct CanvasArgs {
    /// Canvas width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Canvas height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Accepted deviation of the aspect ratio from 1.0
    #[arg(long)]
    pub tolerance: Option<f64>,
}

impl CanvasArgs {
    pub fn resolve(&self, config: &Config) -> TransformParams {
        let defaults = TransformParams::from_config(config);
        TransformParams::new(
            self.width.unwrap_or(defaults.width),
            self.height.unwrap_or(defaults.height),
            self.tolerance.unwrap_or(defaults.tolerance),
        )
    }
}

/// `--deliver-to` wins, then the bot API when a token is configured.
pub fn configured_delivery(
    config: &Config,
    deliver_to: Option<PathBuf>,
) -> anyhow::Result<Option<Box<dyn Delivery>>> {
    if let Some(dir) = deliver_to {
        return Ok(Some(Box::new(LocalDelivery::new(dir))));
    }
    match HttpDelivery::from_config(&config.delivery)? {
        Some(http) => {
            tracing::debug!("Delivering through {:?}", http);
            Ok(Some(Box::new(http)))
        }
        None => Ok(None),
    }
}

/// Private copies of input files.
///
/// Jobs consume their inputs; staging keeps the caller's originals intact.
/// Each file gets its own sub-directory so names are preserved.
pub struct Staging {
    dir: tempfile::TempDir,
    next: usize,
}

impl Staging {
    pub fn new(base: &Path) -> io::Result<Self> {
        fs::create_dir_all(base)?;
        let dir = tempfile::Builder::new().prefix("incoming-").tempdir_in(base)?;
        Ok(Self { dir, next: 0 })
    }

    pub fn stage(&mut self, source: &Path) -> io::Result<PathBuf> {
        let name = source.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "input has no file name")
        })?;
        let slot = self.dir.path().join(self.next.to_string());
        self.next += 1;
        fs::create_dir_all(&slot)?;
        let target = slot.join(name);
        fs::copy(source, &target)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_args_fall_back_to_config() {
        let config = Config::default();
        let params = CanvasArgs {
            width: Some(1080),
            ..CanvasArgs::default()
        }
        .resolve(&config);
        assert_eq!(params.width, 1080);
        assert_eq!(params.height, 1200);
        assert_eq!(params.tolerance, 0.15);
    }

    #[test]
    fn staging_copies_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("photos.zip");
        fs::write(&original, b"PK").unwrap();

        let staged_root;
        {
            let mut staging = Staging::new(&dir.path().join("work")).unwrap();
            let first = staging.stage(&original).unwrap();
            let second = staging.stage(&original).unwrap();
            assert_ne!(first, second);
            assert_eq!(first.file_name(), original.file_name());
            staged_root = first.parent().unwrap().parent().unwrap().to_path_buf();
        }
        assert!(original.exists());
        assert!(!staged_root.exists());
    }
}
