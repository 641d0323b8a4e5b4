//! Client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Default feed host
pub const DEFAULT_HOST: &str = "tcp-v1.benzinga.io";

/// Default feed port
pub const DEFAULT_PORT: u16 = 11337;

/// Keepalive cadence
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(5);

/// Slack added to the read timeout so a due ping is not raced by it
pub const DEFAULT_PING_MARGIN: Duration = Duration::from_millis(500);

/// Maximum buffered bytes without a terminator (1MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// What to do with a steady-state frame that carries no payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyPayloadPolicy {
    /// Treat it as a dead stream and fail with `NotConnected`
    #[default]
    Disconnect,
    /// Treat it as a heartbeat and keep reading
    Skip,
}

/// Immutable settings for a session and its client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub ping_interval: Duration,
    pub ping_margin: Duration,
    /// `None` leaves the TCP connect to the OS default
    pub connect_timeout: Option<Duration>,
    /// Read timeout while authenticating, `None` blocks indefinitely
    pub handshake_timeout: Option<Duration>,
    pub max_frame_size: usize,
    pub empty_payload: EmptyPayloadPolicy,
    /// Re-establish the session when the content stream drops
    pub reconnect: bool,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ping_interval: DEFAULT_PING_INTERVAL,
            ping_margin: DEFAULT_PING_MARGIN,
            connect_timeout: None,
            handshake_timeout: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            empty_payload: EmptyPayloadPolicy::default(),
            reconnect: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Default configuration pointed at `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidConfig("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(Error::InvalidConfig("port must not be 0".into()));
        }
        if self.ping_interval.is_zero() {
            return Err(Error::InvalidConfig("ping interval must be positive".into()));
        }
        if self.max_frame_size == 0 {
            return Err(Error::InvalidConfig("max frame size must be positive".into()));
        }
        self.retry.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "tcp-v1.benzinga.io");
        assert_eq!(config.port, 11337);
        assert_eq!(config.ping_interval, Duration::from_secs(5));
        assert_eq!(config.ping_margin, Duration::from_millis(500));
        assert_eq!(config.empty_payload, EmptyPayloadPolicy::Disconnect);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nonsense() {
        assert!(ClientConfig::new("", 11337).validate().is_err());
        assert!(ClientConfig::new("localhost", 0).validate().is_err());

        let config = ClientConfig {
            ping_interval: Duration::ZERO,
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
