//! Feed session: one connection, its handshake and its keepalive schedule
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ connect ┌───────────┐ authenticate ┌───────────────┐
//! │ Disconnected │────────>│ Connected │─────────────>│ Authenticated │
//! └──────────────┘         └───────────┘              └───────────────┘
//!        ^                       │ rejection / error          │ EOF / error
//!        └───────────────────────┴────────────────────────────┘
//! ```
//!
//! A failed connection is dropped, never repaired; the caller reconnects.
//!
//! # Keepalive
//!
//! There is no timer thread. Before every read the session sends a ping if
//! one is due, then bounds the read by the time left until the next ping
//! (plus a small margin). A read timeout simply wakes the loop up again.

use std::iter;
use std::time::Instant;

use chrono::Local;
use serde_json::Value;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::{ClientConfig, EmptyPayloadPolicy};
use crate::error::{Error, Result};
use crate::frame::FramedTransport;
use crate::protocol::{Credentials, Message, PingPayload, Status};
use crate::transport::{Connector, TcpConnector};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// Transport open, handshake not done
    Connected,
    Authenticated,
}

/// One feed connection and everything that belongs to it
pub struct Session<C: Connector = TcpConnector, K: Clock = SystemClock> {
    config: ClientConfig,
    credentials: Credentials,
    connector: C,
    clock: K,
    transport: Option<FramedTransport<C::Transport>>,
    state: SessionState,
    next_ping: Instant,
}

impl Session {
    /// Unconnected TCP session
    pub fn new(credentials: Credentials, config: ClientConfig) -> Self {
        Self::with_parts(credentials, config, TcpConnector, SystemClock)
    }
}

impl<C: Connector, K: Clock> Session<C, K> {
    /// Unconnected session over a custom connector and clock
    pub fn with_parts(
        credentials: Credentials,
        config: ClientConfig,
        connector: C,
        clock: K,
    ) -> Self {
        let next_ping = clock.now() + config.ping_interval;
        Self {
            config,
            credentials,
            connector,
            clock,
            transport: None,
            state: SessionState::Disconnected,
            next_ping,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    /// Open a fresh transport, discarding any previous one and its buffer
    pub fn connect(&mut self) -> Result<()> {
        self.disconnect();

        info!(host = %self.config.host, port = self.config.port, "Connecting to feed");
        let stream = self.connector.connect(
            &self.config.host,
            self.config.port,
            self.config.connect_timeout,
        )?;

        self.transport = Some(FramedTransport::new(stream, self.config.max_frame_size));
        self.next_ping = self.clock.now() + self.config.ping_interval;
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Drop the current connection, if any
    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            debug!("Dropping feed connection");
        }
        self.state = SessionState::Disconnected;
    }

    /// Run the READY / AUTH / CONNECTED handshake on a fresh connection
    pub fn authenticate(&mut self) -> Result<()> {
        match self.state {
            SessionState::Disconnected => {
                return Err(Error::not_connected("connect before authenticating"))
            }
            SessionState::Authenticated => return Err(Error::AlreadyAuthenticated),
            SessionState::Connected => {}
        }

        match self.handshake() {
            Ok(()) => {
                self.state = SessionState::Authenticated;
                info!(username = %self.credentials.username, "Authenticated with feed");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn handshake(&mut self) -> Result<()> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| Error::not_connected("no live connection"))?;
        transport.set_read_timeout(self.config.handshake_timeout)?;

        let greeting = transport.read_message()?;
        if greeting.status != Status::Ready {
            return Err(Error::ServerUnavailable {
                status: greeting.status.to_string(),
            });
        }

        transport.write_message(&Message::auth(&self.credentials)?)?;

        let reply = transport.read_message()?;
        match reply.status {
            Status::Connected => Ok(()),
            Status::InvalidKey | Status::InvalidKeyFormat => Err(Error::InvalidCredentials {
                username: self.credentials.username.clone(),
                status: reply.status.to_string(),
            }),
            Status::DuplicateConnection => Err(Error::TooManyConnections {
                username: self.credentials.username.clone(),
            }),
            other => Err(Error::UnknownError {
                status: other.to_string(),
            }),
        }
    }

    /// Send a keepalive stamped with the current local time
    ///
    /// No reply is awaited.
    pub fn ping(&mut self) -> Result<()> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| Error::not_connected("no live connection to ping on"))?;

        let payload = PingPayload::at(Local::now().naive_local());
        transport.write_message(&Message::ping(&payload)?)?;
        debug!(ping_time = %payload.ping_time, "Sent ping");
        Ok(())
    }

    /// Block until the next message with a payload arrives, pinging on schedule
    pub fn next_message(&mut self) -> Result<Message> {
        if self.state != SessionState::Authenticated {
            return Err(Error::not_connected("session is not authenticated"));
        }

        loop {
            match self.poll_message() {
                Ok(Some(msg)) => return Ok(msg),
                Ok(None) => continue,
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    /// One wake-up of the keepalive loop; `None` when nothing deliverable arrived
    fn poll_message(&mut self) -> Result<Option<Message>> {
        let now = self.clock.now();
        if now > self.next_ping {
            self.ping()?;
            self.next_ping = now + self.config.ping_interval;
        }

        let until_ping = self.next_ping.saturating_duration_since(now);
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| Error::not_connected("no live connection"))?;
        transport.set_read_timeout(Some(until_ping + self.config.ping_margin))?;

        let msg = match transport.read_message() {
            Ok(msg) => msg,
            Err(Error::Timeout) => return Ok(None),
            Err(Error::ConnectionClosed) => {
                return Err(Error::not_connected("feed closed the connection"))
            }
            Err(e) => return Err(e),
        };

        if msg.has_content() {
            return Ok(Some(msg));
        }

        match self.config.empty_payload {
            EmptyPayloadPolicy::Disconnect => Err(Error::not_connected(format!(
                "received {} frame without payload",
                msg.status
            ))),
            EmptyPayloadPolicy::Skip => {
                debug!(status = %msg.status, "Skipping frame without payload");
                Ok(None)
            }
        }
    }

    /// Next STREAM message, discarding everything else
    pub fn next_content_item(&mut self) -> Result<Message> {
        loop {
            let msg = self.next_message()?;
            if msg.status == Status::Stream {
                return Ok(msg);
            }
            debug!(status = %msg.status, "Discarding non-content message");
        }
    }

    /// Unbounded iterator over content payloads on this connection
    ///
    /// Each `next()` blocks until an item arrives. The first error is yielded
    /// and the iterator then ends; it does not reconnect.
    pub fn content_items(&mut self) -> impl Iterator<Item = Result<Value>> + '_ {
        let mut failed = false;
        iter::from_fn(move || {
            if failed {
                return None;
            }
            let item = self
                .next_content_item()
                .map(|msg| msg.payload.unwrap_or_default());
            failed = item.is_err();
            Some(item)
        })
    }

    fn fail(&mut self, e: Error) -> Error {
        debug!(error = %e, "Session failed");
        self.disconnect();
        e
    }
}
