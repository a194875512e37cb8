//! Resizer CLI - pad archives of photos onto a fixed white canvas.
//!
//! Resizer takes ZIP or RAR archives (or loose images), keeps every image
//! whose aspect ratio is close to square, pads it onto the configured canvas,
//! and returns the results as a new ZIP archive.
//!
//! # Usage
//!
//! ```bash
//! # Process an archive with the configured canvas
//! resizer process photos.zip
//!
//! # Override the canvas and tolerance
//! resizer process a.zip b.rar --width 1080 --height 1080 --tolerance 0.1
//!
//! # Pad loose images and deliver them to a directory
//! resizer images one.jpg two.png --user 42 --deliver-to ./out
//!
//! # Usage statistics
//! resizer stats
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Resizer - pad archives of photos onto a fixed canvas.
#[derive(Parser, Debug)]
#[command(name = "resizer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Process one or more ZIP/RAR archives
    Process(cli::process::ProcessArgs),

    /// Process loose images and deliver each result individually
    Images(cli::images::ImagesArgs),

    /// Show usage statistics
    Stats(cli::stats::StatsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is the normal case.
    let _ = dotenvy::dotenv();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match resizer_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `resizer config path`."
            );
            resizer_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Resizer v{}", resizer_core::VERSION);

    match cli.command {
        Commands::Process(args) => cli::process::execute(args).await,
        Commands::Images(args) => cli::images::execute(args).await,
        Commands::Stats(args) => cli::stats::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_process_with_overrides() {
        let cli = Cli::try_parse_from([
            "resizer",
            "-v",
            "process",
            "a.zip",
            "b.rar",
            "--width",
            "1080",
            "--tolerance",
            "0.1",
            "--user",
            "42",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Process(args) => {
                assert_eq!(args.archives.len(), 2);
                assert_eq!(args.canvas.width, Some(1080));
                assert_eq!(args.canvas.height, None);
                assert_eq!(args.user.as_deref(), Some("42"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn images_requires_user() {
        assert!(Cli::try_parse_from(["resizer", "images", "a.jpg"]).is_err());
    }
}
