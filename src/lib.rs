//! Single-item auction served by independent replicas.
//!
//! Replicas never talk to each other. A bidder broadcasts every bid to all
//! replicas it managed to reach and reports each replica's answer on its own,
//! so two replicas can disagree about who is winning. That mode is named
//! [`ConsistencyMode::BestEffort`].

pub mod bidder;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod messages;
pub mod replica;
pub mod transport;

pub use bidder::{Bidder, BidReport, ConnectionState, ReplicaConnection, Status};
pub use console::{parse_command, run_console, Command};
pub use config::{candidate_ports, BidderConfig, ClosingSchedule, ReplicaConfig};
pub use error::{InputError, ServerError, TransportError};
pub use messages::{Ack, Outcome, Request, Response};
pub use replica::{Auction, ReplicaServer};

pub type Port = u16;

/// How replicas relate to each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsistencyMode {
    /// Blind broadcast without agreement. Replicas may diverge when a call
    /// to one of them is dropped.
    BestEffort,
}

impl std::fmt::Display for ConsistencyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsistencyMode::BestEffort => write!(f, "best-effort replication"),
        }
    }
}
