//! Server configuration.

use std::time::Duration;

use helm_settings::{AuthMode, ServerSettings};

/// Configuration for the gateway server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (0 for auto-assign).
    pub port: u16,
    /// Client authentication mode.
    pub auth_mode: AuthMode,
    /// Shared secret for [`AuthMode::Token`].
    pub auth_token: Option<String>,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Interval between server-initiated pings.
    pub heartbeat_interval: Duration,
    /// Disconnect clients unresponsive for this long.
    pub heartbeat_timeout: Duration,
    /// Max inbound frame size in bytes.
    pub max_message_size: usize,
    /// Per-request handler timeout.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_settings(&ServerSettings::default())
    }
}

impl ServerConfig {
    /// Build a config from loaded settings.
    #[must_use]
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            auth_mode: settings.auth.mode,
            auth_token: settings.auth.token.clone(),
            max_connections: settings.max_connections,
            heartbeat_interval: Duration::from_secs(settings.heartbeat_interval_secs),
            heartbeat_timeout: Duration::from_secs(settings.heartbeat_timeout_secs),
            max_message_size: settings.max_message_size,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
        }
    }

    /// The socket address string to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_follows_settings() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.auth_mode, AuthMode::None);
        assert_eq!(cfg.max_connections, 50);
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(30));
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let cfg = ServerConfig {
            host: "0.0.0.0".into(),
            port: 9090,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9090");
    }

    #[test]
    fn token_settings_carry_through() {
        let mut settings = ServerSettings::default();
        settings.auth.mode = AuthMode::Token;
        settings.auth.token = Some("s3cret".into());
        let cfg = ServerConfig::from_settings(&settings);
        assert_eq!(cfg.auth_mode, AuthMode::Token);
        assert_eq!(cfg.auth_token.as_deref(), Some("s3cret"));
    }
}
