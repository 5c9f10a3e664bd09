//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Dexcom Share polling client for smart-mirror dashboards.
#[derive(Parser, Debug)]
#[command(name = "dexpoll")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Config file path (default: platform config dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Share account name
    #[arg(long, env = "DEXPOLL_USERNAME", value_name = "NAME", global = true)]
    pub username: Option<String>,

    /// Share account password
    #[arg(
        long,
        env = "DEXPOLL_PASSWORD",
        value_name = "PASSWORD",
        hide_env_values = true,
        global = true
    )]
    pub password: Option<String>,

    /// Regional endpoint: us or eu
    #[arg(long, value_name = "REGION", global = true)]
    pub region: Option<String>,

    /// Explicit Share host override (no scheme)
    #[arg(long, value_name = "HOST", global = true)]
    pub server_url: Option<String>,

    /// Poll interval in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub update_secs: Option<u64>,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format (human, json, compact)
    #[arg(long, value_name = "FORMAT", global = true)]
    pub log_format: Option<String>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the poll loop, streaming JSON-line events to stdout (default)
    Run,

    /// Fetch the latest reading once, print it, and exit
    Fetch,

    /// Fetch a history window once, print it, and exit
    History(HistoryArgs),
}

/// Arguments for the `history` command.
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Window to fetch, in minutes (the widget uses 180/360/720/1440)
    #[arg(long, value_name = "MINUTES", default_value_t = 180)]
    pub minutes: u32,
}
