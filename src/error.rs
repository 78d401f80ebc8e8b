use thiserror::Error;

use crate::Port;

/// Problems with what the operator typed. Never reaches a replica.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("{0:?} is not a whole number")]
    InvalidAmount(String),

    #[error("bid amount must not be negative, got {0}")]
    NegativeAmount(i64),

    #[error("console input could not be read")]
    Unreadable,
}

/// A call to one replica failed below the auction protocol.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("connection closed by peer")]
    Closed,

    #[error("no reply before the deadline")]
    Timeout,

    #[error("reply does not match the request")]
    UnexpectedResponse,
}

/// Replica startup failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("none of the ports {0:?} could be bound")]
    NoPortAvailable(Vec<Port>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
