//! CLI argument parsing and command dispatch.

pub mod args;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::core::config::{Config, Region};
use crate::core::models::ApiResponse;
use crate::error::{DexpollError, ExitCode, Result};
use crate::poll::retry::{self, DEFAULT_MAX_ATTEMPTS};
use crate::poll::scheduler::{POLL_WINDOW_MINUTES, Poller, READING_INTERVAL_MINUTES};
use crate::share::ShareClient;

pub use args::{Cli, Commands, HistoryArgs};

/// Resolve configuration: file (explicit path, else the default location if it
/// exists), then CLI/env overrides, then validation.
///
/// # Errors
///
/// Returns config errors from parsing or validation.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(path) = &cli.config {
        Config::parse_file(path)?
    } else if let Some(path) = Config::default_path().filter(|p| p.exists()) {
        Config::parse_file(&path)?
    } else {
        Config::default()
    };

    if let Some(username) = &cli.username {
        config.username = username.clone();
    }
    if let Some(password) = &cli.password {
        config.password = password.clone();
    }
    if let Some(region) = &cli.region {
        config.region = Region::from_arg(region).ok_or_else(|| DexpollError::ConfigInvalid {
            key: "region".to_string(),
            message: format!("unknown region '{region}', expected 'us' or 'eu'"),
        })?;
    }
    if let Some(server_url) = &cli.server_url {
        config.server_url = Some(server_url.clone());
    }
    if let Some(update_secs) = cli.update_secs {
        config.update_secs = update_secs;
    }

    config.validate()?;
    Ok(config)
}

/// Execute the selected command.
///
/// # Errors
///
/// Returns crate-level errors (config, client build, serialization); fetch
/// failures are reported through the printed response and the exit code.
pub async fn execute(cli: Cli) -> Result<ExitCode> {
    let config = resolve_config(&cli)?;
    match cli.command {
        None | Some(Commands::Run) => run(&config).await,
        Some(Commands::Fetch) => fetch_once(&config, 1, POLL_WINDOW_MINUTES).await,
        Some(Commands::History(args)) => {
            let max_count = args.minutes.div_ceil(READING_INTERVAL_MINUTES) + 1;
            fetch_once(&config, max_count, args.minutes).await
        }
    }
}

/// Run the poll loop until interrupted, printing one JSON line per event.
async fn run(config: &Config) -> Result<ExitCode> {
    let client = Arc::new(ShareClient::new(
        config.server_host(),
        &config.username,
        &config.password,
    )?);

    let (tx, mut rx) = mpsc::channel(16);
    let poller = Arc::new(Poller::new(client, config.update_secs, tx));

    let poll_loop = {
        let poller = Arc::clone(&poller);
        tokio::spawn(async move { poller.run().await })
    };

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => println!("{}", serde_json::to_string(&event)?),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                break;
            }
        }
    }

    poll_loop.abort();
    Ok(ExitCode::Success)
}

/// One-shot fetch (used by `fetch` and `history`): run the retry orchestrator
/// once, print the terminal response, and map its outcome to an exit code.
async fn fetch_once(config: &Config, max_count: u32, minutes: u32) -> Result<ExitCode> {
    let client = ShareClient::new(config.server_host(), &config.username, &config.password)?;
    let response: ApiResponse =
        retry::fetch_with_retry(&client, max_count, minutes, DEFAULT_MAX_ATTEMPTS).await;
    println!("{}", serde_json::to_string(&response)?);
    Ok(if response.is_err() {
        ExitCode::FetchError
    } else {
        ExitCode::Success
    })
}
