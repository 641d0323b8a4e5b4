//! Settings file loader
//!
//! Optional TOML file, e.g.:
//!
//! ```toml
//! host = "tcp-v1.benzinga.io"
//! port = 11337
//! ping_interval_secs = 5.0
//! empty_payload = "skip"
//!
//! [retry]
//! max_attempts = 5
//! initial_delay_secs = 1.0
//! backoff_multiplier = 2.0
//! ```
//!
//! Precedence: command line, then file, then built-in defaults.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bztcp_net::{ClientConfig, EmptyPayloadPolicy};
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::cli::Cli;

/// Settings file name inside the config directory
const SETTINGS_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Settings as written in the file; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ping_interval_secs: Option<f64>,
    pub connect_timeout_secs: Option<f64>,
    pub handshake_timeout_secs: Option<f64>,
    pub empty_payload: Option<EmptyPayloadPolicy>,
    pub reconnect: Option<bool>,
    pub retry: RetrySettings,
}

/// `[retry]` table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: Option<u32>,
    pub initial_delay_secs: Option<f64>,
    pub backoff_multiplier: Option<f64>,
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `config.toml` in the per-user config directory
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "benzinga", "bztcp")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Load `explicit` if given (it must exist), else the default file if present
    pub fn discover(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                debug!(path = %path.display(), "Loading settings");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Overlay command-line overrides
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(host) = &cli.host {
            self.host = Some(host.clone());
        }
        if cli.port.is_some() {
            self.port = cli.port;
        }
        if cli.retries.is_some() {
            self.retry.max_attempts = cli.retries;
        }
        if cli.retry_delay.is_some() {
            self.retry.initial_delay_secs = cli.retry_delay;
        }
        if cli.backoff.is_some() {
            self.retry.backoff_multiplier = cli.backoff;
        }
        if cli.skip_heartbeats {
            self.empty_payload = Some(EmptyPayloadPolicy::Skip);
        }
        if cli.no_reconnect {
            self.reconnect = Some(false);
        }
        self
    }

    /// Resolve into a client configuration, filling gaps with defaults
    pub fn into_config(self) -> Result<ClientConfig, SettingsError> {
        let mut config = ClientConfig::default();
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secs) = self.ping_interval_secs {
            config.ping_interval = seconds("ping_interval_secs", secs)?;
        }
        if let Some(secs) = self.connect_timeout_secs {
            config.connect_timeout = Some(seconds("connect_timeout_secs", secs)?);
        }
        if let Some(secs) = self.handshake_timeout_secs {
            config.handshake_timeout = Some(seconds("handshake_timeout_secs", secs)?);
        }
        if let Some(policy) = self.empty_payload {
            config.empty_payload = policy;
        }
        if let Some(reconnect) = self.reconnect {
            config.reconnect = reconnect;
        }
        if let Some(attempts) = self.retry.max_attempts {
            config.retry.max_attempts = attempts;
        }
        if let Some(secs) = self.retry.initial_delay_secs {
            config.retry.initial_delay = seconds("retry.initial_delay_secs", secs)?;
        }
        if let Some(multiplier) = self.retry.backoff_multiplier {
            config.retry.backoff_multiplier = multiplier;
        }
        config
            .validate()
            .map_err(|e| SettingsError::Invalid(e.to_string()))?;
        Ok(config)
    }
}

fn seconds(name: &str, secs: f64) -> Result<Duration, SettingsError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        SettingsError::Invalid(format!(
            "{} must be a non-negative number of seconds, got {}",
            name, secs
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.into_config().unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_parse_full_settings() {
        let toml = r#"
host = "localhost"
port = 9000
ping_interval_secs = 2.5
handshake_timeout_secs = 10
empty_payload = "skip"
reconnect = false

[retry]
max_attempts = 5
initial_delay_secs = 0.25
backoff_multiplier = 3.0
"#;
        let config = Settings::from_toml(toml).unwrap().into_config().unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 9000);
        assert_eq!(config.ping_interval, Duration::from_millis(2500));
        assert_eq!(config.handshake_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.connect_timeout, None);
        assert_eq!(config.empty_payload, EmptyPayloadPolicy::Skip);
        assert!(!config.reconnect);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.retry.backoff_multiplier, 3.0);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Settings::from_toml("hots = \"typo\"").is_err());
    }

    #[test]
    fn test_negative_duration_rejected() {
        let settings = Settings::from_toml("ping_interval_secs = -1.0").unwrap();
        assert!(matches!(
            settings.into_config(),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn test_invalid_backoff_rejected() {
        let settings = Settings::from_toml("[retry]\nbackoff_multiplier = 0.5").unwrap();
        assert!(settings.into_config().is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let settings = Settings::from_toml("host = \"file-host\"\nport = 1234").unwrap();
        let cli = Cli::try_parse_from([
            "bztcp",
            "u",
            "k",
            "--port",
            "4321",
            "--skip-heartbeats",
        ])
        .unwrap();

        let config = settings.apply_cli(&cli).into_config().unwrap();
        assert_eq!(config.host, "file-host");
        assert_eq!(config.port, 4321);
        assert_eq!(config.empty_payload, EmptyPayloadPolicy::Skip);
        assert!(config.reconnect);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 7000").unwrap();

        let settings = Settings::discover(Some(file.path())).unwrap();
        assert_eq!(settings.port, Some(7000));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::discover(Some(dir.path().join("absent.toml").as_path()));
        assert!(matches!(result, Err(SettingsError::Read { .. })));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        assert!(matches!(
            Settings::load(file.path()),
            Err(SettingsError::Parse { .. })
        ));
    }
}
