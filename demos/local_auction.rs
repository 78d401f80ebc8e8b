// demos/local_auction.rs
use replicated_auction::*;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Starting a local auction with 3 replicas");
    println!("========================================");
    println!("Consistency: {}\n", ConsistencyMode::BestEffort);

    let mut shutdowns = Vec::new();
    let mut handles = Vec::new();
    let mut ports = Vec::new();

    for i in 0..3 {
        let config = ReplicaConfig {
            name: format!("replica-{}", i),
            host: "127.0.0.1".to_string(),
            ports: vec![0],
            schedule: ClosingSchedule::Fixed(Duration::from_secs(3)),
        };
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let server = match ReplicaServer::bind(&config, shutdown_rx).await {
            Ok(server) => server,
            Err(e) => {
                eprintln!("Replica {} failed to start: {}", i, e);
                continue;
            }
        };

        println!("  Replica {} listening on port {}", i, server.port());
        ports.push(server.port());
        shutdowns.push(shutdown_tx);
        handles.push(tokio::spawn(server.run()));
    }

    let bidder_config = |name: &str| BidderConfig {
        name: name.to_string(),
        host: "127.0.0.1".to_string(),
        ports: ports.clone(),
        dial_timeout: Duration::from_secs(1),
        call_timeout: Duration::from_secs(1),
    };

    let mut alice = Bidder::connect_all(&bidder_config("alice")).await;
    let mut bob = Bidder::connect_all(&bidder_config("bob")).await;

    for (who, amount) in [("alice", 50), ("bob", 30), ("bob", 80), ("alice", 80)] {
        let bidder = if who == "alice" { &mut alice } else { &mut bob };
        println!("\n{} bids {}", bidder.name(), amount);
        for report in bidder.broadcast_bid(amount).await {
            println!("  {}", report);
        }
    }

    println!("\nStatus: {}", alice.query_status().await);

    println!("\nWaiting for the auction to close...");
    sleep(Duration::from_secs(4)).await;

    for report in alice.broadcast_bid(1_000).await {
        println!("  {}", report);
    }
    println!("Final: {}", bob.query_status().await);

    for shutdown in shutdowns {
        let _ = shutdown.send(()).await;
    }
    for handle in handles {
        let _ = handle.await;
    }
}
