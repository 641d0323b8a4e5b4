//! Terminator-delimited frame reading/writing
//!
//! Wire format: `<body>=BZEOT\r\n`, repeated. Reads are buffered so a frame
//! split across several reads, or several frames packed into one read, come
//! out one frame per call.

use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::{Message, FRAME_TERMINATOR};
use crate::transport::Transport;

/// Bytes requested from the stream per read
const READ_CHUNK: usize = 4096;

/// Smallest timeout handed to the stream (sockets reject a zero timeout)
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// A transport plus the bytes received on it that are not yet a full frame
pub struct FramedTransport<T> {
    stream: T,
    buffer: Vec<u8>,
    /// Buffer prefix already known to hold no terminator
    scanned: usize,
    max_frame_size: usize,
}

impl<T: Transport> FramedTransport<T> {
    pub fn new(stream: T, max_frame_size: usize) -> Self {
        Self {
            stream,
            buffer: Vec::with_capacity(READ_CHUNK),
            scanned: 0,
            max_frame_size,
        }
    }

    /// Bound the next reads by `timeout` (`None` blocks indefinitely)
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.map(|t| t.max(MIN_READ_TIMEOUT));
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Number of received bytes not yet returned as a frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Return the next complete frame, terminator included
    ///
    /// Fails with [`Error::Timeout`] when the read timeout expires (buffered
    /// bytes are kept for the next call) and with [`Error::ConnectionClosed`]
    /// when the peer closes the stream.
    pub fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.pop_frame() {
                return Ok(frame);
            }

            if self.buffer.len() > self.max_frame_size {
                return Err(Error::Framing(format!(
                    "no terminator within {} bytes (max {})",
                    self.buffer.len(),
                    self.max_frame_size
                )));
            }

            match self.stream.read(&mut chunk) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => {
                    trace!(bytes = n, buffered = self.buffer.len() + n, "Read chunk");
                    self.buffer.extend_from_slice(&chunk[..n]);
                }
                Err(e) if is_timeout(&e) => return Err(Error::Timeout),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    /// Read and decode the next frame
    pub fn read_message(&mut self) -> Result<Message> {
        let frame = self.read_frame()?;
        Message::from_bytes(&frame)
    }

    /// Encode and send a message, flushing to ensure delivery
    pub fn write_message(&mut self, msg: &Message) -> Result<()> {
        let frame = msg.to_bytes()?;
        self.stream.write_all(&frame)?;
        self.stream.flush()?;
        Ok(())
    }

    fn pop_frame(&mut self) -> Option<Vec<u8>> {
        // Resume a little before the scanned mark in case a terminator straddles it
        let start = self.scanned.saturating_sub(FRAME_TERMINATOR.len() - 1);
        match self.buffer[start..]
            .windows(FRAME_TERMINATOR.len())
            .position(|w| w == FRAME_TERMINATOR)
        {
            Some(pos) => {
                let end = start + pos + FRAME_TERMINATOR.len();
                let frame: Vec<u8> = self.buffer.drain(..end).collect();
                self.scanned = 0;
                Some(frame)
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
