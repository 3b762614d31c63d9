// ABOUTME: Main viewsync relay implementation
// ABOUTME: Provides the WebSocket endpoint and coordinates peer bookkeeping

use crate::relay::config::RelayConfig;
use crate::relay::handler::handle_peer;
use crate::relay::peers::PeerRegistry;
use axum::{
    extract::ws::WebSocketUpgrade,
    extract::State,
    response::IntoResponse,
    routing::any,
    Router,
};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Relay configuration
    pub config: Arc<RelayConfig>,
    /// Peer registry
    pub registry: Arc<PeerRegistry>,
}

/// ViewSync relay server
pub struct RelayServer {
    /// Relay configuration
    config: Arc<RelayConfig>,
    /// Peer registry
    registry: Arc<PeerRegistry>,
}

impl RelayServer {
    /// Create a new relay with default configuration
    pub fn new() -> Self {
        Self::with_config(RelayConfig::default())
    }

    /// Create a new relay with custom configuration
    pub fn with_config(config: RelayConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(PeerRegistry::new()),
        }
    }

    /// Get the relay configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Get the peer registry
    pub fn registry(&self) -> Arc<PeerRegistry> {
        Arc::clone(&self.registry)
    }

    /// Run the relay
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let config = self.config.clone();
        let registry = self.registry.clone();

        // Age out peers whose heartbeats stopped without a socket error
        let sweep_registry = registry.clone();
        let stale_after = config.peer_stale_after;
        let sweep_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(stale_after / 2);
            loop {
                interval.tick().await;
                if sweep_registry.sweep_stale(stale_after) {
                    sweep_registry.broadcast_presence_snapshot();
                }
            }
        });

        // Build application state
        let state = AppState {
            config: config.clone(),
            registry,
        };

        // Build router
        let app = Router::new()
            .route(&config.ws_path, any(ws_handler))
            .with_state(state);

        // Bind and serve
        let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
        log::info!(
            "viewsync relay listening on {} (endpoint: {})",
            config.bind_addr,
            config.ws_path
        );

        // Setup graceful shutdown
        let shutdown_signal = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for Ctrl-C");
            log::info!("Received shutdown signal");
        };

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        sweep_task.abort();

        log::info!("Relay shutdown complete");
        Ok(())
    }
}

impl Default for RelayServer {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_peer(socket, state.registry))
}
