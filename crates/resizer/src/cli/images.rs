//! The `resizer images` command for loose images.

use std::path::PathBuf;

use clap::Args;
use resizer_core::{Config, Delivery, ImageBatchRequest, LocalDelivery, Pipeline};

use super::{configured_delivery, CanvasArgs, Staging};

/// Arguments for the `images` command.
#[derive(Args, Debug)]
pub struct ImagesArgs {
    /// Image files to process
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Requester identity; also the chat id for HTTP delivery
    #[arg(short, long)]
    pub user: String,

    /// Deliver into this directory instead of the bot API
    #[arg(long)]
    pub deliver_to: Option<PathBuf>,

    #[command(flatten)]
    pub canvas: CanvasArgs,

    /// Hand the images to the pipeline directly; they are deleted afterwards
    #[arg(long)]
    pub consume: bool,
}

/// Execute the images command.
pub async fn execute(args: ImagesArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let params = args.canvas.resolve(&config);
    params.validate()?;

    let delivery = select_delivery(&config, args.deliver_to.clone())?;

    // Staged copies live until the batch is done.
    let mut staging = None;
    let images = if args.consume {
        args.images.clone()
    } else {
        let staging = staging.insert(Staging::new(&config.work_dir())?);
        let mut staged = Vec::with_capacity(args.images.len());
        for image in &args.images {
            if image.exists() {
                staged.push(staging.stage(image)?);
            } else {
                // Keep the path so the batch reports it as not found.
                staged.push(image.clone());
            }
        }
        staged
    };

    let pipeline = Pipeline::from_config(&config);
    let summary = pipeline
        .process_images(
            ImageBatchRequest {
                requester: args.user.clone(),
                images,
                params,
            },
            delivery.as_ref(),
        )
        .await;
    drop(staging);

    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

/// Images always go somewhere: without `--deliver-to` or a bot token they
/// land in the output directory.
fn select_delivery(
    config: &Config,
    deliver_to: Option<PathBuf>,
) -> anyhow::Result<Box<dyn Delivery>> {
    match configured_delivery(config, deliver_to)? {
        Some(delivery) => Ok(delivery),
        None => {
            let dir = config.output_dir();
            tracing::info!("No bot token configured; delivering into {:?}", dir);
            Ok(Box::new(LocalDelivery::new(dir)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directory_wins() {
        let config = Config::default();
        let delivery = select_delivery(&config, Some(PathBuf::from("/tmp/out")));
        assert!(delivery.is_ok());
    }

    #[test]
    fn falls_back_to_local_without_token() {
        let mut config = Config::default();
        config.delivery.token = String::new();
        assert!(select_delivery(&config, None).is_ok());
    }
}
