// ABOUTME: ViewSync relay binary
// ABOUTME: Standalone pub/sub relay for cross-device synchronization

use clap::Parser;
use viewsync::relay::{RelayArgs, RelayServer};

#[derive(Parser, Debug)]
#[command(name = "viewsync-relay")]
#[command(author, version, about = "ViewSync pub/sub relay", long_about = None)]
struct Args {
    #[command(flatten)]
    relay: RelayArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Initialize tracing
    args.relay.init_tracing();

    // Log startup info
    args.relay.log_startup_info();

    // Create relay configuration
    let config = args.relay.build_config();

    // Create and run relay
    let server = RelayServer::with_config(config);
    let registry = server.registry();

    // Spawn a task to periodically report connected peers
    let report_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(30));
        loop {
            interval.tick().await;
            let count = registry.peer_count();
            if count > 0 {
                tracing::info!(
                    "Connected peers: {} ({} tracked)",
                    count,
                    registry.presence_snapshot().len()
                );
            }
        }
    });

    tracing::info!("Press Ctrl+C to stop");

    let result = server.run().await;
    report_task.abort();
    result
}
