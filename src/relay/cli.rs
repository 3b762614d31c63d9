// ABOUTME: Shared CLI argument parsing for the relay binary
// ABOUTME: Consolidates tracing setup and config building

use crate::relay::RelayConfig;
use clap::Args;
use std::net::SocketAddr;
use std::time::Duration;

/// Common relay arguments
///
/// Use with `#[command(flatten)]` in your binary's Args struct:
/// ```ignore
/// #[derive(Parser)]
/// struct MyArgs {
///     #[command(flatten)]
///     relay: RelayArgs,
/// }
/// ```
#[derive(Args, Debug, Clone)]
pub struct RelayArgs {
    /// Address to bind the relay to
    #[arg(short, long, default_value = "0.0.0.0:8931")]
    pub bind: SocketAddr,

    /// Relay name
    #[arg(short, long, default_value = "ViewSync Relay")]
    pub name: String,

    /// WebSocket endpoint path
    #[arg(long, default_value = "/sync")]
    pub path: String,

    /// Seconds of silence before a peer is dropped
    #[arg(long, default_value = "60")]
    pub peer_stale_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl RelayArgs {
    /// Initialize tracing based on verbosity flag
    pub fn init_tracing(&self) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let filter = if self.verbose {
            "viewsync=debug,tower_http=debug"
        } else {
            "viewsync=info"
        };

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| filter.into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    /// Log startup information
    pub fn log_startup_info(&self) {
        tracing::info!("ViewSync Relay v{}", env!("CARGO_PKG_VERSION"));
        tracing::info!("Bind: {}", self.bind);
        tracing::info!("Endpoint: ws://{}{}", self.bind, self.path);
    }

    /// Build RelayConfig from these args
    pub fn build_config(&self) -> RelayConfig {
        RelayConfig::new(&self.name)
            .bind_addr(self.bind)
            .ws_path(self.path.clone())
            .peer_stale_after(Duration::from_secs(self.peer_stale_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        // Verify default values are sensible
        let args = RelayArgs {
            bind: "0.0.0.0:8931".parse().unwrap(),
            name: "Test Relay".to_string(),
            path: "/sync".to_string(),
            peer_stale_secs: 60,
            verbose: false,
        };

        assert_eq!(args.bind.port(), 8931);
        assert_eq!(args.peer_stale_secs, 60);
    }

    #[test]
    fn test_build_config() {
        let args = RelayArgs {
            bind: "127.0.0.1:9000".parse().unwrap(),
            name: "Custom Relay".to_string(),
            path: "/custom".to_string(),
            peer_stale_secs: 30,
            verbose: false,
        };

        let config = args.build_config();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.ws_path, "/custom");
        assert_eq!(config.peer_stale_after, Duration::from_secs(30));
    }
}
