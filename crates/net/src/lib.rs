//! Benzinga TCP feed client
//!
//! Connects to the feed service, authenticates, and pulls content items
//! while keeping the connection alive with periodic pings.
//!
//! # Architecture
//!
//! - **Protocol**: `STATUS[: JSON]=BZEOT\r\n` frames
//! - **Frame**: buffers partial reads, yields one frame per call
//! - **Session**: one connection, its handshake and keepalive schedule
//! - **Retry**: bounded exponential backoff for connectivity failures
//! - **Client**: session + retry, exposed as a blocking iterator; stream
//!   drops reconnect under one shared backoff budget
//!
//! Everything is synchronous: the keepalive is driven by the read timeout,
//! not by a background thread.
//!
//! # Usage
//!
//! ```no_run
//! use bztcp_net::{Client, ClientConfig, Credentials};
//!
//! let mut client = Client::connect(Credentials::new("user", "key"), ClientConfig::default())?;
//! for item in client.content_items() {
//!     let item = item?;
//!     println!("{}", item["title"]);
//! }
//! # Ok::<(), bztcp_net::Error>(())
//! ```

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
mod frame;
pub mod protocol;
pub mod retry;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{Client, ContentItems};
pub use clock::{Clock, SystemClock};
pub use config::{ClientConfig, EmptyPayloadPolicy, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{Error, Result};
pub use frame::FramedTransport;
pub use protocol::{Credentials, Message, Status};
pub use retry::{retry, retry_with_sleep, Backoff, RetryPolicy};
pub use session::{Session, SessionState};
pub use transport::{Connector, TcpConnector, Transport};
