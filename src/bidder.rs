use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::BidderConfig;
use crate::error::TransportError;
use crate::messages::{Ack, Outcome, Request, Response};
use crate::transport::NetworkTransport;
use crate::Port;

/// Local health of a replica connection. Says nothing about the auction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Ready,
    /// A call failed or the peer went away. Never leaves this state.
    Failed,
}

/// Persistent connection to one replica, dialed once at startup.
pub struct ReplicaConnection {
    port: Port,
    transport: NetworkTransport,
    state: ConnectionState,
    call_timeout: Duration,
}

impl ReplicaConnection {
    pub async fn dial(
        host: &str,
        port: Port,
        dial_timeout: Duration,
        call_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let stream = match timeout(dial_timeout, TcpStream::connect((host, port))).await {
            Ok(stream) => stream?,
            Err(_) => return Err(TransportError::Timeout),
        };

        Ok(Self {
            port,
            transport: NetworkTransport::new(stream),
            state: ConnectionState::Ready,
            call_timeout,
        })
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Re-checks the socket, so a replica that went away since the last call
    /// shows up as not ready.
    pub fn is_ready(&mut self) -> bool {
        if self.state == ConnectionState::Ready && !self.transport.is_healthy() {
            debug!(port = self.port, "connection no longer healthy");
            self.state = ConnectionState::Failed;
        }
        self.state == ConnectionState::Ready
    }

    pub async fn submit_bid(&mut self, amount: i64, bidder: &str) -> Result<Ack, TransportError> {
        let request = Request::SubmitBid {
            amount,
            bidder: bidder.to_string(),
        };
        match self.call(&request).await? {
            Response::Ack(ack) => Ok(ack),
            Response::Outcome(_) => self.fail(TransportError::UnexpectedResponse),
        }
    }

    pub async fn query_result(&mut self) -> Result<Outcome, TransportError> {
        match self.call(&Request::QueryResult).await? {
            Response::Outcome(outcome) => Ok(outcome),
            Response::Ack(_) => self.fail(TransportError::UnexpectedResponse),
        }
    }

    async fn call(&mut self, request: &Request) -> Result<Response, TransportError> {
        let transport = &mut self.transport;
        let exchange = async {
            transport.send(request).await?;
            transport
                .recv::<Response>()
                .await?
                .ok_or(TransportError::Closed)
        };

        let result = timeout(self.call_timeout, exchange).await;
        match result {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => self.fail(e),
            Err(_) => self.fail(TransportError::Timeout),
        }
    }

    fn fail<T>(&mut self, error: TransportError) -> Result<T, TransportError> {
        self.state = ConnectionState::Failed;
        Err(error)
    }
}

/// What one replica said about one bid.
#[derive(Debug)]
pub struct BidReport {
    pub port: Port,
    pub result: Result<Ack, TransportError>,
}

impl std::fmt::Display for BidReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            Ok(ack) => write!(f, "replica {}: bid {}", self.port, ack),
            Err(e) => write!(f, "replica {}: bid failed, no response ({})", self.port, e),
        }
    }
}

/// Answer to a status query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// First replica that answered, and its answer.
    Known { port: Port, outcome: Outcome },
    /// No replica could be asked.
    Unknown,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Known { port, outcome } => write!(f, "replica {}: {}", port, outcome),
            Status::Unknown => write!(f, "status unknown: no replica answered"),
        }
    }
}

/// Fans operator actions out to every replica it could reach.
pub struct Bidder {
    name: String,
    replicas: Vec<ReplicaConnection>,
}

impl Bidder {
    pub fn new(name: impl Into<String>, replicas: Vec<ReplicaConnection>) -> Self {
        Self {
            name: name.into(),
            replicas,
        }
    }

    /// Dials every configured port in order. Unreachable ports are logged
    /// and left out for good.
    pub async fn connect_all(config: &BidderConfig) -> Self {
        let mut replicas = Vec::new();

        for &port in &config.ports {
            info!(bidder = %config.name, port, "dialing replica");
            match ReplicaConnection::dial(&config.host, port, config.dial_timeout, config.call_timeout)
                .await
            {
                Ok(conn) => {
                    info!(bidder = %config.name, port, "connected");
                    replicas.push(conn);
                }
                Err(e) => {
                    warn!(bidder = %config.name, port, error = %e, "failed to dial");
                }
            }
        }

        Self::new(config.name.clone(), replicas)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn replicas(&self) -> &[ReplicaConnection] {
        &self.replicas
    }

    /// Sends the bid to each ready replica in turn. Replicas that are not
    /// ready are skipped without a report.
    pub async fn broadcast_bid(&mut self, amount: i64) -> Vec<BidReport> {
        let mut reports = Vec::new();

        for replica in self.replicas.iter_mut() {
            if !replica.is_ready() {
                continue;
            }

            let result = replica.submit_bid(amount, &self.name).await;
            match &result {
                Ok(ack) => {
                    info!(bidder = %self.name, port = replica.port(), amount, "bid {}", ack);
                }
                Err(e) => {
                    warn!(
                        bidder = %self.name,
                        port = replica.port(),
                        amount,
                        error = %e,
                        "bid failed, no response from replica"
                    );
                }
            }
            reports.push(BidReport {
                port: replica.port(),
                result,
            });
        }

        reports
    }

    /// Asks ready replicas in order and returns the first answer.
    pub async fn query_status(&mut self) -> Status {
        for replica in self.replicas.iter_mut() {
            if !replica.is_ready() {
                continue;
            }

            match replica.query_result().await {
                Ok(outcome) => {
                    info!(bidder = %self.name, port = replica.port(), "{}", outcome);
                    return Status::Known {
                        port: replica.port(),
                        outcome,
                    };
                }
                Err(e) => {
                    warn!(
                        bidder = %self.name,
                        port = replica.port(),
                        error = %e,
                        "status query failed, trying next replica"
                    );
                }
            }
        }

        warn!(bidder = %self.name, "no replica answered the status query");
        Status::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClosingSchedule;
    use crate::replica::Auction;
    use tokio::net::TcpListener;

    const DIAL: Duration = Duration::from_millis(500);
    const CALL: Duration = Duration::from_millis(300);

    /// Answers requests from an auction until the listener task is aborted.
    async fn spawn_replica() -> (Port, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let auction = Auction::start("test", port, ClosingSchedule::Fixed(Duration::from_secs(600)));

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut transport = NetworkTransport::new(stream);
            while let Ok(Some(request)) = transport.recv::<Request>().await {
                let response = auction.handle(request).await;
                transport.send(&response).await.unwrap();
            }
        });

        (port, handle)
    }

    async fn closed_port() -> Port {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_dial_refused() {
        let port = closed_port().await;
        let result = ReplicaConnection::dial("127.0.0.1", port, DIAL, CALL).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_bid_and_query_over_connection() {
        let (port, _replica) = spawn_replica().await;
        let mut conn = ReplicaConnection::dial("127.0.0.1", port, DIAL, CALL)
            .await
            .unwrap();

        assert!(conn.is_ready());
        assert_eq!(conn.submit_bid(10, "alice").await.unwrap(), Ack::Accepted);
        assert_eq!(conn.submit_bid(10, "bob").await.unwrap(), Ack::RejectedLow);

        let outcome = conn.query_result().await.unwrap();
        assert_eq!(outcome.highest_bid, 10);
        assert_eq!(outcome.highest_bidder, "alice");
        assert!(outcome.is_open);
    }

    #[tokio::test]
    async fn test_silent_replica_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _silent = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let mut conn = ReplicaConnection::dial("127.0.0.1", port, DIAL, CALL)
            .await
            .unwrap();
        let result = conn.submit_bid(5, "alice").await;

        assert!(matches!(result, Err(TransportError::Timeout)));
        assert_eq!(conn.state(), ConnectionState::Failed);
        assert!(!conn.is_ready());
    }

    #[tokio::test]
    async fn test_dead_replica_is_skipped() {
        let (live_port, _live) = spawn_replica().await;
        let (dead_port, dead) = spawn_replica().await;

        let replicas = vec![
            ReplicaConnection::dial("127.0.0.1", dead_port, DIAL, CALL)
                .await
                .unwrap(),
            ReplicaConnection::dial("127.0.0.1", live_port, DIAL, CALL)
                .await
                .unwrap(),
        ];
        let mut bidder = Bidder::new("alice", replicas);

        dead.abort();
        let _ = dead.await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let reports = bidder.broadcast_bid(20).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].port, live_port);
        assert_eq!(reports[0].result.as_ref().unwrap(), &Ack::Accepted);

        match bidder.query_status().await {
            Status::Known { port, outcome } => {
                assert_eq!(port, live_port);
                assert_eq!(outcome.highest_bid, 20);
            }
            Status::Unknown => panic!("live replica should answer"),
        }
    }

    #[tokio::test]
    async fn test_no_replicas() {
        let mut bidder = Bidder::new("alice", Vec::new());
        assert!(bidder.broadcast_bid(10).await.is_empty());
        assert_eq!(bidder.query_status().await, Status::Unknown);
    }

    #[tokio::test]
    async fn test_report_lines() {
        let report = BidReport {
            port: 5400,
            result: Ok(Ack::RejectedLow),
        };
        assert_eq!(report.to_string(), "replica 5400: bid rejected: too low");

        let failed = BidReport {
            port: 5401,
            result: Err(TransportError::Timeout),
        };
        assert_eq!(
            failed.to_string(),
            "replica 5401: bid failed, no response (no reply before the deadline)"
        );
    }
}
