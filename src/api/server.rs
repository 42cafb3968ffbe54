//! API Server
//!
//! Builds the component graph for the selected service mode and serves it
//! until Ctrl+C / SIGTERM.

use super::{
    handlers::{AppState, ServiceMode},
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::{
    config::{RouletteConfig, ServerConfig},
    errors::RouletteResult,
    games::{LocalSettlementService, RemoteSettlementClient, SettlementService},
    random::{FairRandomSource, FallbackChain, OsEntropy, SeededEntropy},
    table::{BroadcastHub, RoundManager},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

/// HTTP / WebSocket server for one service mode
pub struct ApiServer {
    config: RouletteConfig,
    mode: ServiceMode,
}

impl ApiServer {
    pub fn new(config: RouletteConfig, mode: ServiceMode) -> Self {
        Self { config, mode }
    }

    /// Start the server
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let state = Arc::new(self.build_state()?);
        let round_loop = state.table.as_ref().map(|table| table.spawn());

        let app = create_app(state, &self.config.server);
        let addr = self.get_socket_addr()?;

        info!("🌐 Starting roulette {} service (HTTP)", self.mode);
        info!("   Listen: http://{}", addr);
        self.log_server_info();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("✅ Server running");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(handle) = round_loop {
            handle.abort();
        }
        info!("🛑 Server stopped gracefully");
        Ok(())
    }

    /// Wire the components the mode needs
    pub fn build_state(&self) -> RouletteResult<AppState> {
        let state = match self.mode {
            ServiceMode::Table => AppState::for_table(Arc::new(self.build_table()?)),
            ServiceMode::Settlement => AppState::for_settlement(Arc::new(self.local_settlement())),
            ServiceMode::Rng => AppState::for_rng(self.raw_source()),
        };
        Ok(state)
    }

    fn build_table(&self) -> RouletteResult<RoundManager> {
        let table = &self.config.table;
        let settlement: Arc<dyn SettlementService> = match &table.settlement_url {
            Some(url) => Arc::new(RemoteSettlementClient::new(url, table.settlement_timeout())?),
            None => Arc::new(self.local_settlement()),
        };
        let hub = Arc::new(BroadcastHub::new(table.client_queue_capacity));

        Ok(RoundManager::new(table.clone(), hub, settlement)
            .with_override_pocket(self.config.testing.override_pocket))
    }

    fn local_settlement(&self) -> LocalSettlementService {
        LocalSettlementService::new(FairRandomSource::from_config(&self.config.random))
            .allow_override(self.config.testing.allow_override_pocket)
    }

    /// OS generator backed by the seeded one; never the remote service
    fn raw_source(&self) -> FairRandomSource {
        let random = &self.config.random;
        let seeded = match random.fallback_seed {
            Some(seed) => SeededEntropy::new(seed, random.block_size),
            None => SeededEntropy::from_clock(random.block_size),
        };
        FairRandomSource::new(FallbackChain::new(vec![
            Box::new(OsEntropy::new(random.block_size)),
            Box::new(seeded),
        ]))
    }

    fn get_socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.server.host.parse::<std::net::IpAddr>()?,
            self.config.server.port,
        )))
    }

    fn log_server_info(&self) {
        let table = &self.config.table;
        info!("📋 Server Configuration:");
        info!("   Version: {}", env!("CARGO_PKG_VERSION"));
        info!("   CORS: {:?}", self.config.server.allowed_origins);
        info!("   Request timeout: {}s", self.config.server.request_timeout_secs);

        match self.mode {
            ServiceMode::Table => {
                if table.is_manual() {
                    info!("   Rounds: manual (resolved by spin)");
                } else {
                    info!(
                        "   Rounds: open {}ms, pause {}ms",
                        table.open_window_ms, table.pause_window_ms
                    );
                }
                info!(
                    "   Settlement: {} (timeout {}ms)",
                    table.settlement_url.as_deref().unwrap_or("local"),
                    table.settlement_timeout_ms
                );
                info!("   Client queue capacity: {}", table.client_queue_capacity);
                info!("📊 Available endpoints:");
                info!("   GET  /health  - Health check");
                info!("   GET  /state   - Round snapshot");
                info!("   GET  /ws      - Live table");
            }
            ServiceMode::Settlement => {
                info!("📊 Available endpoints:");
                info!("   GET  /health  - Health check");
                info!("   POST /settle  - Settle a round");
            }
            ServiceMode::Rng => {
                info!("📊 Available endpoints:");
                info!("   GET  /health  - Health check");
                info!("   GET  /rng     - Raw random values");
            }
        }
    }
}

/// Router with the middleware stack
pub fn create_app(state: Arc<AppState>, server: &ServerConfig) -> axum::Router {
    create_router(state)
        // Request ID middleware (first for tracing)
        .layer(axum::middleware::from_fn(request_id_middleware))
        // CORS layer (before timeout to handle preflight)
        .layer(create_cors_layer(server.allowed_origins.clone()))
        .layer(TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
