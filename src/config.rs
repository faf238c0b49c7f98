//! Runtime configuration, loaded from the environment and overridden by CLI flags.

use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8765;

/// Timeouts applied by the hub when talking to peers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Upper bound for delivering one frame to one peer
    pub send_timeout: Duration,
    /// Upper bound for closing one peer during shutdown
    pub close_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(5),
            close_timeout: Duration::from_secs(2),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub hub: HubConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            hub: HubConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("BROADCAST_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.host);

        let port = env_parse("BROADCAST_PORT").unwrap_or(defaults.port);

        let send_timeout = env_parse("BROADCAST_SEND_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.hub.send_timeout);

        let close_timeout = env_parse("BROADCAST_CLOSE_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.hub.close_timeout);

        tracing::debug!(
            host = %host,
            port,
            send_timeout_ms = send_timeout.as_millis() as u64,
            close_timeout_ms = close_timeout.as_millis() as u64,
            "Server config loaded"
        );

        Self {
            host,
            port,
            hub: HubConfig {
                send_timeout,
                close_timeout,
            },
        }
    }

    /// Apply CLI flags on top of the environment
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration of the interactive `connect` client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
}

impl ClientConfig {
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment variable");
            None
        }
    }
}
