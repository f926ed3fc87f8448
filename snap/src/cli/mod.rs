// CLI argument parsing and definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "snap")]
#[command(about = "Snapshot a cloud instance and prune old snapshots")]
#[command(version)]
pub struct Args {
    /// Numeric id of the instance to snapshot
    pub instance_id: u64,

    /// Cloud provider hosting the instance (e.g. "hetzner")
    pub provider: String,

    /// Number of most recent snapshots to keep for this instance
    pub keep: usize,

    /// Path to a custom configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show the retention plan without creating, deleting or pinging anything
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Seconds between action status queries (overrides polling.interval_secs)
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Give up after this many status queries (overrides polling.max_attempts)
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}
