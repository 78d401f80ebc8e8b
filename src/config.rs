use rand::{thread_rng, Rng};
use std::time::Duration;

use crate::Port;

// Constants
pub const DEFAULT_PRIMARY_PORT: Port = 5400;
pub const FALLBACK_PORTS: [Port; 4] = [5401, 5402, 5403, 5404];
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_AUCTION_DURATION: Duration = Duration::from_secs(120);
pub const RANDOM_WINDOW_MIN: Duration = Duration::from_secs(15);
pub const RANDOM_WINDOW_MAX: Duration = Duration::from_secs(60);
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// The primary port followed by the fixed fallbacks, without repeats.
pub fn candidate_ports(primary: Port) -> Vec<Port> {
    let mut ports = vec![primary];
    for port in FALLBACK_PORTS {
        if !ports.contains(&port) {
            ports.push(port);
        }
    }
    ports
}

/// When a replica stops accepting bids, measured from its construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClosingSchedule {
    Fixed(Duration),
    /// Drawn uniformly from `min..=max` once per replica.
    Randomized { min: Duration, max: Duration },
}

impl ClosingSchedule {
    pub fn random_window() -> Self {
        ClosingSchedule::Randomized {
            min: RANDOM_WINDOW_MIN,
            max: RANDOM_WINDOW_MAX,
        }
    }

    pub fn draw(&self) -> Duration {
        match *self {
            ClosingSchedule::Fixed(duration) => duration,
            ClosingSchedule::Randomized { min, max } if max <= min => min,
            ClosingSchedule::Randomized { min, max } => {
                let millis = thread_rng().gen_range(min.as_millis()..=max.as_millis());
                Duration::from_millis(millis as u64)
            }
        }
    }
}

impl Default for ClosingSchedule {
    fn default() -> Self {
        ClosingSchedule::Fixed(DEFAULT_AUCTION_DURATION)
    }
}

#[derive(Clone, Debug)]
pub struct ReplicaConfig {
    /// Label used in log lines.
    pub name: String,
    pub host: String,
    /// Tried in order; the first one that binds wins.
    pub ports: Vec<Port>,
    pub schedule: ClosingSchedule,
}

impl ReplicaConfig {
    pub fn new(name: impl Into<String>, preferred_port: Port) -> Self {
        Self {
            name: name.into(),
            host: DEFAULT_HOST.to_string(),
            ports: candidate_ports(preferred_port),
            schedule: ClosingSchedule::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BidderConfig {
    /// Identity attached to every bid.
    pub name: String,
    pub host: String,
    pub ports: Vec<Port>,
    pub dial_timeout: Duration,
    pub call_timeout: Duration,
}

impl BidderConfig {
    pub fn new(name: impl Into<String>, primary_port: Port) -> Self {
        Self {
            name: name.into(),
            host: DEFAULT_HOST.to_string(),
            ports: candidate_ports(primary_port),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_ports() {
        assert_eq!(candidate_ports(5400), vec![5400, 5401, 5402, 5403, 5404]);
        assert_eq!(candidate_ports(6000), vec![6000, 5401, 5402, 5403, 5404]);
        // Primary inside the fallback range is not listed twice
        assert_eq!(candidate_ports(5402), vec![5402, 5401, 5403, 5404]);
    }

    #[test]
    fn test_randomized_schedule_stays_in_window() {
        let schedule = ClosingSchedule::random_window();
        for _ in 0..100 {
            let drawn = schedule.draw();
            assert!(drawn >= RANDOM_WINDOW_MIN && drawn <= RANDOM_WINDOW_MAX);
        }
    }

    #[test]
    fn test_degenerate_window() {
        let schedule = ClosingSchedule::Randomized {
            min: Duration::from_secs(5),
            max: Duration::from_secs(1),
        };
        assert_eq!(schedule.draw(), Duration::from_secs(5));
        assert_eq!(ClosingSchedule::default().draw(), DEFAULT_AUCTION_DURATION);
    }
}
