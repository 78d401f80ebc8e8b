use serde::{Deserialize, Serialize};

/// Requests a bidder can send to a replica.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    SubmitBid { amount: i64, bidder: String },
    QueryResult,
}

/// Replies sent by a replica, one per request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Ack(Ack),
    Outcome(Outcome),
}

/// Answer to a bid submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ack {
    Accepted,
    /// Amount was not strictly above the current highest bid.
    RejectedLow,
    RejectedClosed,
}

impl std::fmt::Display for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ack::Accepted => write!(f, "accepted"),
            Ack::RejectedLow => write!(f, "rejected: too low"),
            Ack::RejectedClosed => write!(f, "rejected: closed"),
        }
    }
}

/// Snapshot of one replica's view of the auction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub is_open: bool,
    pub highest_bid: i64,
    pub highest_bidder: String,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_open {
            write!(
                f,
                "the highest bid is {} by {:?}",
                self.highest_bid, self.highest_bidder
            )
        } else if self.highest_bidder.is_empty() {
            write!(f, "the auction is over without any bids")
        } else {
            write!(
                f,
                "the auction is over, the winner is {} with a bid of {}",
                self.highest_bidder, self.highest_bid
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let bid = Request::SubmitBid {
            amount: 42,
            bidder: "alice".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&bid).unwrap(),
            r#"{"SubmitBid":{"amount":42,"bidder":"alice"}}"#
        );
        assert_eq!(
            serde_json::to_string(&Request::QueryResult).unwrap(),
            r#""QueryResult""#
        );
        assert_eq!(
            serde_json::to_string(&Response::Ack(Ack::RejectedClosed)).unwrap(),
            r#"{"Ack":"RejectedClosed"}"#
        );
    }

    #[test]
    fn test_outcome_display() {
        let open = Outcome {
            is_open: true,
            highest_bid: 10,
            highest_bidder: "bob".to_string(),
        };
        assert_eq!(open.to_string(), "the highest bid is 10 by \"bob\"");

        let won = Outcome {
            is_open: false,
            ..open
        };
        assert_eq!(
            won.to_string(),
            "the auction is over, the winner is bob with a bid of 10"
        );

        let empty = Outcome::default();
        assert_eq!(empty.to_string(), "the auction is over without any bids");
    }
}
