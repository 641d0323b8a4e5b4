//! Feed client: an authenticated session kept alive across drops

use serde_json::Value;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::protocol::Credentials;
use crate::retry::{retry_with_sleep, Backoff};
use crate::session::Session;
use crate::transport::{Connector, TcpConnector};

/// Client handle for the content stream
pub struct Client<C: Connector = TcpConnector, K: Clock = SystemClock> {
    session: Session<C, K>,
    /// Reconnect budget, refilled whenever an item is delivered
    backoff: Backoff,
}

impl Client {
    /// Connect and authenticate over TCP
    ///
    /// Connectivity failures are retried per `config.retry`; credential
    /// rejections fail immediately.
    pub fn connect(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Self::with_session(Session::new(credentials, config))
    }
}

impl<C: Connector, K: Clock> Client<C, K> {
    /// Establish `session` (connect + authenticate under the retry policy)
    pub fn with_session(session: Session<C, K>) -> Result<Self> {
        let backoff = Backoff::new(session.config().retry);
        let mut client = Client { session, backoff };
        client.establish()?;
        Ok(client)
    }

    pub fn session(&self) -> &Session<C, K> {
        &self.session
    }

    fn establish(&mut self) -> Result<()> {
        let policy = self.session.config().retry;
        let clock = self.session.clock().clone();
        let session = &mut self.session;
        retry_with_sleep(&policy, |delay| clock.sleep(delay), || {
            session.connect()?;
            session.authenticate()
        })
    }

    /// Next content payload, reconnecting when the stream drops
    ///
    /// Consecutive drops share one retry budget and one growing delay, so a
    /// feed that accepts the handshake and then hangs up is given up on after
    /// `config.retry.max_attempts` reconnects. The budget is refilled once an
    /// item arrives.
    pub fn next_content_item(&mut self) -> Result<Value> {
        loop {
            match self.session.next_content_item() {
                Ok(msg) => {
                    self.backoff.reset();
                    return Ok(msg.payload.unwrap_or_default());
                }
                Err(e) if e.is_recoverable() && self.session.config().reconnect => {
                    warn!(error = %e, "Feed connection lost");
                    self.reconnect(e)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Back off and reconnect until authenticated or out of budget
    ///
    /// `cause` is returned once the budget is spent.
    fn reconnect(&mut self, mut cause: Error) -> Result<()> {
        loop {
            let Some(delay) = self.backoff.next_delay() else {
                warn!(error = %cause, "Reconnect attempts exhausted");
                return Err(cause);
            };
            warn!(
                delay_secs = delay.as_secs_f64(),
                remaining = self.backoff.remaining(),
                "Reconnecting to feed"
            );
            self.session.clock().sleep(delay);

            let attempt = self
                .session
                .connect()
                .and_then(|()| self.session.authenticate());
            match attempt {
                Ok(()) => {
                    info!("Feed connection re-established");
                    return Ok(());
                }
                Err(e) if e.is_recoverable() => cause = e,
                Err(e) => return Err(e),
            }
        }
    }

    /// Unbounded iterator over content payloads
    pub fn content_items(&mut self) -> ContentItems<'_, C, K> {
        ContentItems {
            client: self,
            finished: false,
        }
    }
}

/// Blocking iterator over content payloads
///
/// `next()` blocks until an item arrives, pinging the feed while it waits.
/// It never returns `None` on its own: the stream ends only after yielding
/// an error the client could not recover from.
pub struct ContentItems<'a, C: Connector = TcpConnector, K: Clock = SystemClock> {
    client: &'a mut Client<C, K>,
    finished: bool,
}

impl<C: Connector, K: Clock> Iterator for ContentItems<'_, C, K> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = self.client.next_content_item();
        self.finished = item.is_err();
        Some(item)
    }
}
