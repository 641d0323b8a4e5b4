//! Feed protocol message types
//!
//! Every message is a status token, optionally followed by `": "` and a JSON
//! payload, and always terminated by [`FRAME_TERMINATOR`]:
//!
//! ```text
//! READY=BZEOT\r\n
//! AUTH: {"username":"u","key":"k"}=BZEOT\r\n
//! STREAM: {"title":"X"}=BZEOT\r\n
//! ```

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// End-of-transmission marker closing every frame
pub const FRAME_TERMINATOR: &[u8] = b"=BZEOT\r\n";

/// Separator written between status and payload
const PAYLOAD_SEPARATOR: &[u8] = b": ";

/// Status token carried at the start of every frame
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    /// Server is ready to receive credentials
    Ready,
    /// Client credentials
    Auth,
    /// Credentials accepted
    Connected,
    /// Unknown username or key
    InvalidKey,
    /// Key is not well formed
    InvalidKeyFormat,
    /// Another connection is already open for this key
    DuplicateConnection,
    /// Content item
    Stream,
    /// Keepalive
    Ping,
    /// Any token the server sends that is not listed above
    Other(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Ready => "READY",
            Status::Auth => "AUTH",
            Status::Connected => "CONNECTED",
            Status::InvalidKey => "INVALID KEY",
            Status::InvalidKeyFormat => "INVALID KEY FORMAT",
            Status::DuplicateConnection => "DUPLICATE CONNECTION",
            Status::Stream => "STREAM",
            Status::Ping => "PING",
            Status::Other(token) => token,
        }
    }
}

impl From<&str> for Status {
    fn from(token: &str) -> Self {
        match token {
            "READY" => Status::Ready,
            "AUTH" => Status::Auth,
            "CONNECTED" => Status::Connected,
            "INVALID KEY" => Status::InvalidKey,
            "INVALID KEY FORMAT" => Status::InvalidKeyFormat,
            "DUPLICATE CONNECTION" => Status::DuplicateConnection,
            "STREAM" => Status::Stream,
            "PING" => Status::Ping,
            other => Status::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Username/key pair sent as the AUTH payload
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub key: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            key: key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Keepalive payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingPayload {
    #[serde(rename = "pingTime")]
    pub ping_time: String,
}

impl PingPayload {
    /// Ping stamped with `time` as a naive ISO-8601 timestamp
    pub fn at(time: NaiveDateTime) -> Self {
        Self {
            ping_time: time.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        }
    }
}

/// A single protocol message
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub status: Status,
    /// Present only when the frame carried a `:` separator
    pub payload: Option<Value>,
}

impl Message {
    pub fn new(status: Status, payload: Option<Value>) -> Self {
        Self { status, payload }
    }

    /// AUTH message carrying the credentials
    pub fn auth(credentials: &Credentials) -> Result<Self> {
        Ok(Self::new(Status::Auth, Some(to_payload(credentials)?)))
    }

    /// PING message carrying the given timestamp
    pub fn ping(payload: &PingPayload) -> Result<Self> {
        Ok(Self::new(Status::Ping, Some(to_payload(payload)?)))
    }

    /// True when the payload carries something other than `null` or `""`
    pub fn has_content(&self) -> bool {
        match &self.payload {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// Encode into a complete wire frame, terminator included
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        check_encodable(&self.status)?;
        let status = self.status.as_str();

        let mut frame = Vec::with_capacity(status.len() + FRAME_TERMINATOR.len() + 64);
        frame.extend_from_slice(status.as_bytes());
        if let Some(payload) = &self.payload {
            frame.extend_from_slice(PAYLOAD_SEPARATOR);
            serde_json::to_writer(&mut frame, payload)
                .map_err(|e| Error::Framing(format!("Serialization failed: {}", e)))?;
        }
        frame.extend_from_slice(FRAME_TERMINATOR);
        Ok(frame)
    }

    /// Decode one terminator-delimited frame
    ///
    /// The body is split on the first `:` only, so JSON payloads (which
    /// contain colons of their own) survive intact.
    pub fn from_bytes(frame: &[u8]) -> Result<Self> {
        let body = frame
            .strip_suffix(FRAME_TERMINATOR)
            .ok_or_else(|| Error::Framing("frame does not end with the terminator".into()))?;

        match body.iter().position(|&b| b == b':') {
            Some(split) => {
                let status = decode_status(&body[..split])?;
                let data = body[split + 1..].trim_ascii();
                let payload = serde_json::from_slice(data)
                    .map_err(|e| Error::Framing(format!("Invalid JSON: {}", e)))?;
                Ok(Self::new(status, Some(payload)))
            }
            None => Ok(Self::new(decode_status(body)?, None)),
        }
    }
}

/// Refuse `Other` tokens that would decode as something else
fn check_encodable(status: &Status) -> Result<()> {
    let Status::Other(token) = status else {
        return Ok(());
    };
    let problem = if token.contains(':') {
        "contains the payload separator"
    } else if token
        .as_bytes()
        .windows(FRAME_TERMINATOR.len())
        .any(|w| w == FRAME_TERMINATOR)
    {
        "contains the frame terminator"
    } else if token.trim() != token {
        "has surrounding whitespace"
    } else if !matches!(Status::from(token.as_str()), Status::Other(_)) {
        "spells a known status"
    } else {
        return Ok(());
    };
    Err(Error::Framing(format!("status token {:?} {}", token, problem)))
}

fn decode_status(raw: &[u8]) -> Result<Status> {
    let token = std::str::from_utf8(raw)
        .map_err(|e| Error::Framing(format!("status token is not UTF-8: {}", e)))?;
    Ok(Status::from(token.trim()))
}

fn to_payload<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Framing(format!("Serialization failed: {}", e)))
}
