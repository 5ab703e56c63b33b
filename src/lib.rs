//! Roomcast - a room-based WebSocket signaling relay
//!
//! Peers that want to negotiate a direct connection (WebRTC or similar)
//! join a named room over a WebSocket and exchange opaque messages through
//! this server. The relay only ever looks at a message's `type` field to
//! spot joins; everything else is fanned out verbatim to the sender's room
//! peers, excluding the sender. Membership changes are announced with
//! `user-count`, `peer-joined` and `peer-left` notifications.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use roomcast::{App, ConfigBuilder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ConfigBuilder::new()
//!         .from_env()
//!         .build()
//!         .expect("invalid configuration");
//!
//!     roomcast::init_tracing_with_config(&config);
//!
//!     App::with_config(config).serve().await.expect("server error");
//! }
//! ```

#![forbid(unsafe_code)]

mod app;
mod config;
mod error;
pub mod relay;
pub mod status;

// Re-exports for public API
pub use app::App;
pub use config::{Config, ConfigBuilder, LoggingConfig, RelayConfig, ServerConfig};
pub use error::{RelayError, Result};
pub use relay::{
    CloseFrame, Connection, ConnectionHandle, Message, RelayRouter, RoomEvent, RoomRegistry,
    SocketHandler, ws,
};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// Call this early in `main()`, before creating the App.
///
/// # Environment Variables
///
/// - `RUST_LOG`: log filter (e.g. "info", "debug", "roomcast=debug")
/// - `ROOMCAST_LOG_JSON`: set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("ROOMCAST_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing from the logging section of a [`Config`]
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
