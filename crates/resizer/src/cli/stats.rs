//! The `resizer stats` command.

use clap::Args;
use resizer_core::{Config, StatsRecord, StatsStore};
use serde::Serialize;

/// Arguments for the `stats` command.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Print only the JSON record, without the summary table
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Serialize)]
struct StatsView<'a> {
    unique_users: usize,
    #[serde(flatten)]
    record: &'a StatsRecord,
}

/// Execute the stats command.
pub async fn execute(args: StatsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = StatsStore::new(config.stats_file());
    let record = store.snapshot()?;

    println!(
        "{}",
        serde_json::to_string_pretty(&StatsView {
            unique_users: record.unique_users(),
            record: &record,
        })?
    );
    if !args.quiet {
        print_summary(&record);
    }
    Ok(())
}

fn print_summary(record: &StatsRecord) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Statistics");
    eprintln!("  ====================================");
    eprintln!("    Users:        {:>8}", record.unique_users());
    eprintln!("    Archives:     {:>8}", record.archives);
    eprintln!("    Images:       {:>8}", record.images);
    eprintln!("    Resizes:      {:>8}", record.resizes);
    if !record.top_archives.is_empty() {
        eprintln!("  ------------------------------------");
        eprintln!("    Largest archives:");
        for (rank, top) in record.top_archives.iter().enumerate() {
            eprintln!(
                "    {}. {} ({:.2} MB, {:.2}s)",
                rank + 1,
                top.filename,
                top.size as f64 / (1024.0 * 1024.0),
                top.time
            );
        }
    }
    eprintln!("  ====================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_flattens_record() {
        let record = StatsRecord {
            users: vec!["1".to_string(), "2".to_string()],
            archives: 3,
            ..StatsRecord::default()
        };
        let json = serde_json::to_value(StatsView {
            unique_users: record.unique_users(),
            record: &record,
        })
        .unwrap();
        assert_eq!(json["unique_users"], 2);
        assert_eq!(json["archives"], 3);
        assert_eq!(json["users"][1], "2");
    }
}
