// src/bin/bidder.rs

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{stdin, stdout, BufReader};
use tracing::info;

use replicated_auction::config::{DEFAULT_HOST, DEFAULT_PRIMARY_PORT};
use replicated_auction::logging::init_file_logging;
use replicated_auction::{run_console, Bidder, BidderConfig, ConsistencyMode};

/// Interactive bidder. Every bid goes to all reachable replicas.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Bidder identity attached to every bid
    #[arg(long, default_value = "default")]
    name: String,

    /// Primary replica port, tried before the fixed fallbacks
    #[arg(long, default_value_t = DEFAULT_PRIMARY_PORT)]
    server: u16,

    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Give up on a replica that does not accept the connection within this time
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
    dial_timeout: Duration,

    /// Deadline for each bid or status call
    #[arg(long, value_parser = humantime::parse_duration, default_value = "2s")]
    call_timeout: Duration,

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

    let mut config = BidderConfig::new(args.name, args.server);
    config.host = args.host;
    config.dial_timeout = args.dial_timeout;
    config.call_timeout = args.call_timeout;

    let mut bidder = Bidder::connect_all(&config).await;
    let reachable: Vec<_> = bidder.replicas().iter().map(|r| r.port()).collect();
    info!(bidder = %config.name, ?reachable, mode = %ConsistencyMode::BestEffort, "ready");
    println!(
        "Bidder {}: connected to {} of {} replicas ({})",
        config.name,
        reachable.len(),
        config.ports.len(),
        ConsistencyMode::BestEffort
    );

    run_console(&mut bidder, BufReader::new(stdin()), stdout()).await?;
    Ok(())
}
