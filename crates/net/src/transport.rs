//! Blocking byte-stream abstraction under the framed transport
//!
//! Production uses [`TcpStream`]; tests plug in scripted in-memory streams.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

/// A bidirectional byte stream whose reads can be bounded by a timeout.
///
/// A read that runs out of time must fail with `WouldBlock` or `TimedOut`;
/// a read of zero bytes means the peer closed the stream.
pub trait Transport: Read + Write {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }
}

/// Opens a fresh [`Transport`] to a feed endpoint
pub trait Connector {
    type Transport: Transport;

    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> io::Result<Self::Transport>;
}

/// Plain TCP connector
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Transport = TcpStream;

    fn connect(&self, host: &str, port: u16, timeout: Option<Duration>) -> io::Result<TcpStream> {
        let stream = match timeout {
            None => TcpStream::connect((host, port))?,
            Some(timeout) => connect_with_timeout(host, port, timeout)?,
        };
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// Try each resolved address in turn, keeping the last failure
fn connect_with_timeout(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(addr = %addr, error = %e, "Connect attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses resolved for {}:{}", host, port),
        )
    }))
}
