//! Application assembly and serving
//!
//! Builds the full HTTP surface — WebSocket signaling at `/ws`, the status
//! endpoint, and the static UI fallback — and runs it with graceful
//! shutdown on ctrl-c or SIGTERM.

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::relay::{self, RelayRouter, RoomRegistry};
use crate::status;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// The relay server application
pub struct App {
    config: Config,
    registry: Arc<RoomRegistry>,
    router: Router,
}

impl App {
    /// Creates an App with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an App with the provided configuration
    pub fn with_config(config: Config) -> Self {
        let registry = Arc::new(RoomRegistry::with_max_connections(
            config.relay.max_connections,
        ));
        let router = build_router(&config, registry.clone());
        Self {
            config,
            registry,
            router,
        }
    }

    /// The shared room registry backing this app
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Extract the assembled router, e.g. to serve it from a test harness
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Bind and serve until shutdown is signalled
    pub async fn serve(self) -> Result<()> {
        let addr = self
            .config
            .server
            .addr()
            .map_err(|e| RelayError::internal(format!("Invalid server address: {e}")))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Signaling relay listening on http://{}", local_addr);
        tracing::info!("Status endpoint at http://{}/health/check", local_addr);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

fn build_router(config: &Config, registry: Arc<RoomRegistry>) -> Router {
    // `/` serves the directory index; any other unmatched path (the
    // per-room UI links, e.g. `/my-room`) falls back to the same entry page.
    let public_dir = Path::new(&config.relay.public_dir);
    let assets = ServeDir::new(public_dir).fallback(ServeFile::new(public_dir.join("index.html")));

    Router::new()
        .merge(relay::ws(
            "/ws",
            RelayRouter::new(registry.clone()),
            registry.clone(),
        ))
        .merge(status::routes(registry))
        .fallback_service(assets)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
