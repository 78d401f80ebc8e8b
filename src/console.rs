//! Operator prompt for a [`Bidder`].

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::bidder::Bidder;
use crate::error::InputError;

pub const PROMPT: &str = "-> ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Status,
    Bid(i64),
}

/// `None` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line == "status" {
        return Ok(Some(Command::Status));
    }

    let amount: i64 = line
        .parse()
        .map_err(|_| InputError::InvalidAmount(line.to_string()))?;
    if amount < 0 {
        return Err(InputError::NegativeAmount(amount));
    }
    Ok(Some(Command::Bid(amount)))
}

/// Reads commands until `input` is exhausted. Bad input is reported on
/// `output` and never reaches a replica.
pub async fn run_console<R, W>(bidder: &mut Bidder, mut input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output
        .write_all(b"Type your bidding amount here or type \"status\" to get the current highest bid\n")
        .await?;
    output.write_all(b"--------------------\n").await?;

    let mut buf = Vec::new();
    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let command = match std::str::from_utf8(&buf) {
            Ok(line) => parse_command(line),
            Err(_) => Err(InputError::Unreadable),
        };

        match command {
            Ok(None) => {}
            Ok(Some(Command::Status)) => {
                let status = bidder.query_status().await;
                output.write_all(format!("{}\n", status).as_bytes()).await?;
            }
            Ok(Some(Command::Bid(amount))) => {
                for report in bidder.broadcast_bid(amount).await {
                    output.write_all(format!("{}\n", report).as_bytes()).await?;
                }
            }
            Err(e) => {
                warn!(bidder = %bidder.name(), error = %e, "rejected console input");
                output.write_all(format!("invalid input: {}\n", e).as_bytes()).await?;
            }
        }
    }

    info!(bidder = %bidder.name(), "console input closed");
    Ok(())
}
