use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::select;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{ClosingSchedule, ReplicaConfig};
use crate::error::ServerError;
use crate::messages::{Ack, Outcome, Request, Response};
use crate::transport::NetworkTransport;
use crate::Port;

#[derive(Debug)]
struct AuctionState {
    highest_bid: i64,
    highest_bidder: String,
    is_open: bool,
}

/// One replica's copy of the auction.
///
/// Created open. A timer spawned by [`Auction::start`] closes it once the
/// drawn duration has elapsed; nothing else can close or reopen it. Every
/// read and write of the state, including the close, goes through one mutex.
#[derive(Debug)]
pub struct Auction {
    name: String,
    port: Port,
    duration: Duration,
    state: Mutex<AuctionState>,
}

impl Auction {
    /// Builds an open auction and starts its closing timer. Must be called
    /// from within a tokio runtime.
    pub fn start(name: impl Into<String>, port: Port, schedule: ClosingSchedule) -> Arc<Self> {
        let auction = Arc::new(Self {
            name: name.into(),
            port,
            duration: schedule.draw(),
            state: Mutex::new(AuctionState {
                highest_bid: 0,
                highest_bidder: String::new(),
                is_open: true,
            }),
        });

        info!(
            replica = %auction.name,
            port,
            duration = ?auction.duration,
            "auction opened"
        );

        let timer = Arc::clone(&auction);
        tokio::spawn(async move {
            sleep(timer.duration).await;
            timer.close().await;
        });

        auction
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub async fn submit_bid(&self, amount: i64, bidder: &str) -> Ack {
        let mut state = self.state.lock().await;

        if !state.is_open {
            debug!(replica = %self.name, port = self.port, bidder, amount, "bid after close");
            return Ack::RejectedClosed;
        }

        if amount > state.highest_bid {
            state.highest_bid = amount;
            state.highest_bidder = bidder.to_string();
            info!(
                replica = %self.name,
                port = self.port,
                "{} has the highest bid of {}",
                bidder,
                amount
            );
            Ack::Accepted
        } else {
            debug!(
                replica = %self.name,
                port = self.port,
                bidder,
                amount,
                highest = state.highest_bid,
                "bid too low"
            );
            Ack::RejectedLow
        }
    }

    pub async fn query_result(&self) -> Outcome {
        let state = self.state.lock().await;
        Outcome {
            is_open: state.is_open,
            highest_bid: state.highest_bid,
            highest_bidder: state.highest_bidder.clone(),
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::SubmitBid { amount, bidder } => {
                Response::Ack(self.submit_bid(amount, &bidder).await)
            }
            Request::QueryResult => Response::Outcome(self.query_result().await),
        }
    }

    async fn close(&self) {
        let mut state = self.state.lock().await;
        state.is_open = false;

        if state.highest_bidder.is_empty() {
            info!(replica = %self.name, port = self.port, "auction closed without bids");
        } else {
            info!(
                replica = %self.name,
                port = self.port,
                "auction closed, {} wins with a bid of {}",
                state.highest_bidder,
                state.highest_bid
            );
        }
    }
}

/// Accepts bidder connections and answers their requests from one [`Auction`].
pub struct ReplicaServer {
    name: String,
    listener: TcpListener,
    auction: Arc<Auction>,
    shutdown: mpsc::Receiver<()>,
}

impl ReplicaServer {
    /// Binds the first free port of `config.ports`, then opens the auction.
    pub async fn bind(
        config: &ReplicaConfig,
        shutdown: mpsc::Receiver<()>,
    ) -> Result<Self, ServerError> {
        let listener = bind_first_available(&config.name, &config.host, &config.ports).await?;
        let port = listener.local_addr()?.port();
        let auction = Auction::start(config.name.clone(), port, config.schedule);

        Ok(Self {
            name: config.name.clone(),
            listener,
            auction,
            shutdown,
        })
    }

    pub fn port(&self) -> Port {
        self.auction.port()
    }

    pub fn auction(&self) -> Arc<Auction> {
        Arc::clone(&self.auction)
    }

    /// Serves until the shutdown channel fires or its sender is dropped.
    /// Open connections are dropped on the way out.
    pub async fn run(mut self) {
        let mut connections = JoinSet::new();

        loop {
            select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(replica = %self.name, %peer, "bidder connected");
                            let auction = Arc::clone(&self.auction);
                            connections.spawn(serve_connection(
                                NetworkTransport::new(stream),
                                auction,
                                peer,
                            ));
                        }
                        Err(e) => {
                            warn!(replica = %self.name, error = %e, "accept failed");
                        }
                    }
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = self.shutdown.recv() => {
                    break;
                }
            }
        }

        info!(replica = %self.name, port = self.port(), "replica stopped");
    }
}

async fn bind_first_available(
    name: &str,
    host: &str,
    ports: &[Port],
) -> Result<TcpListener, ServerError> {
    for &port in ports {
        info!(replica = %name, port, "trying to create listener");
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                info!(replica = %name, addr = %listener.local_addr()?, "listening");
                return Ok(listener);
            }
            Err(e) => {
                warn!(replica = %name, port, error = %e, "failed to listen");
            }
        }
    }
    Err(ServerError::NoPortAvailable(ports.to_vec()))
}

async fn serve_connection(mut transport: NetworkTransport, auction: Arc<Auction>, peer: SocketAddr) {
    loop {
        let request = match transport.recv::<Request>().await {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!(port = auction.port(), %peer, "bidder disconnected");
                return;
            }
            Err(e) => {
                warn!(port = auction.port(), %peer, error = %e, "dropping connection");
                return;
            }
        };

        let response = auction.handle(request).await;
        if let Err(e) = transport.send(&response).await {
            warn!(port = auction.port(), %peer, error = %e, "reply not delivered");
            return;
        }
    }
}
