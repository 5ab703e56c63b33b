use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration for the relay server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Maximum number of concurrent WebSocket connections (0 = unlimited)
    #[serde(default)]
    pub max_connections: usize,
    /// Directory the UI entry page and assets are served from
    #[serde(default = "default_public_dir")]
    pub public_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_connections: 0,
            public_dir: default_public_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

fn default_public_dir() -> String {
    "public".to_string()
}

impl ServerConfig {
    pub fn addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Get environment variable with ROOMCAST_ prefix, falling back to the
/// unprefixed name for compatibility with standard hosting conventions.
fn env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("ROOMCAST_{key}"))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    /// Set the maximum number of concurrent connections (0 = unlimited)
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.config.relay.max_connections = max_connections;
        self
    }

    pub fn with_public_dir(mut self, public_dir: impl Into<String>) -> Self {
        self.config.relay.public_dir = public_dir.into();
        self
    }

    /// Load configuration from environment variables with ROOMCAST_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(host) = env_with_prefix("HOST") {
            self.config.server.host = host;
        }
        // Check ROOMCAST_PORT first, fall back to PORT (for Railway/Heroku compatibility)
        if let Some(port) = env_with_prefix("PORT") {
            if let Ok(p) = port.parse() {
                self.config.server.port = p;
            }
        }
        if let Some(level) = env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }
        if let Some(max) = env_with_prefix("MAX_CONNECTIONS") {
            if let Ok(m) = max.parse() {
                self.config.relay.max_connections = m;
            }
        }
        if let Some(dir) = env_with_prefix("PUBLIC_DIR") {
            self.config.relay.public_dir = dir;
        }
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config
            .server
            .addr()
            .map_err(|e| RelayError::internal(format!("Invalid server address: {e}")))?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_expected_ports_and_paths() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert_eq!(config.relay.max_connections, 0);
        assert_eq!(config.relay.public_dir, "public");
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = ConfigBuilder::new()
            .with_host("127.0.0.1")
            .with_port(9000)
            .with_log_level("debug")
            .with_max_connections(64)
            .with_public_dir("static")
            .build()
            .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.relay.max_connections, 64);
        assert_eq!(config.relay.public_dir, "static");
    }

    #[test]
    fn build_rejects_unparseable_address() {
        let result = ConfigBuilder::new().with_host("invalid..host").build();
        assert!(result.is_err());
    }
}
