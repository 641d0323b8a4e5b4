//! Network error types

use std::io;

/// Network result type
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The remote end closed the stream (zero-byte read)
    #[error("Connection closed")]
    ConnectionClosed,

    /// A read did not complete within the configured timeout
    #[error("Read timed out")]
    Timeout,

    #[error("Not connected: {reason}")]
    NotConnected { reason: String },

    #[error("Bad credentials provided for {username} (server replied {status})")]
    InvalidCredentials { username: String, status: String },

    #[error("Too many connections for key of {username}")]
    TooManyConnections { username: String },

    #[error("Malformed frame: {0}")]
    Framing(String),

    #[error("Unknown handshake reply: {status}")]
    UnknownError { status: String },

    #[error("Feed service unavailable (expected READY, got {status})")]
    ServerUnavailable { status: String },

    #[error("Already authenticated on this connection")]
    AlreadyAuthenticated,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn not_connected(reason: impl Into<String>) -> Self {
        Error::NotConnected {
            reason: reason.into(),
        }
    }

    /// Whether a fresh connect + authenticate may cure this failure.
    ///
    /// Only connectivity-class failures qualify. Credential rejections,
    /// malformed frames and handshake logic errors would fail the same way
    /// again and are never retried.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::ConnectionClosed
                | Error::Timeout
                | Error::NotConnected { .. }
                | Error::ServerUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_errors_are_recoverable() {
        let io = Error::from(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(io.is_recoverable());
        assert!(Error::ConnectionClosed.is_recoverable());
        assert!(Error::Timeout.is_recoverable());
        assert!(Error::not_connected("stream ended").is_recoverable());
        assert!(Error::ServerUnavailable {
            status: "BUSY".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_rejections_are_not_recoverable() {
        assert!(!Error::InvalidCredentials {
            username: "u".into(),
            status: "INVALID KEY".into()
        }
        .is_recoverable());
        assert!(!Error::TooManyConnections { username: "u".into() }.is_recoverable());
        assert!(!Error::Framing("missing terminator".into()).is_recoverable());
        assert!(!Error::UnknownError {
            status: "HUH".into()
        }
        .is_recoverable());
        assert!(!Error::AlreadyAuthenticated.is_recoverable());
    }
}
