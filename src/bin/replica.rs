// src/bin/replica.rs

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

use replicated_auction::config::{DEFAULT_HOST, DEFAULT_PRIMARY_PORT};
use replicated_auction::logging::init_file_logging;
use replicated_auction::{ClosingSchedule, ReplicaConfig, ReplicaServer};

/// One auction replica. Falls back to the next candidate port if the
/// preferred one is taken.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Name shown in log lines
    #[arg(long, default_value = "default")]
    name: String,

    /// Preferred port
    #[arg(long, default_value_t = DEFAULT_PRIMARY_PORT)]
    port: u16,

    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// How long the auction stays open
    #[arg(long, value_parser = humantime::parse_duration, default_value = "2m")]
    duration: Duration,

    /// Close at a random point between 15s and 60s instead of after `--duration`
    #[arg(long, conflicts_with = "duration")]
    random_window: bool,

    #[arg(long, default_value = "log.txt")]
    log_file: PathBuf,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_file_logging(&args.log_file, args.verbose)
        .with_context(|| format!("opening log file {}", args.log_file.display()))?;

    let schedule = if args.random_window {
        ClosingSchedule::random_window()
    } else {
        ClosingSchedule::Fixed(args.duration)
    };
    let mut config = ReplicaConfig::new(args.name.clone(), args.port);
    config.host = args.host;
    config.schedule = schedule;

    // Held for the life of the process; the replica never shuts itself down
    let (_shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let server = ReplicaServer::bind(&config, shutdown_rx).await?;

    println!(
        "Replica {}: listening on port {}, auction closes in {}",
        args.name,
        server.port(),
        humantime::format_duration(server.auction().duration())
    );

    server.run().await;
    Ok(())
}
