//! Bounded retries with exponential backoff
//!
//! Only failures for which [`Error::is_recoverable`] holds are retried;
//! everything else propagates on first sight.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

/// How many times to retry and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Guarded attempts before the final unguarded one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Factor applied to the delay after every retry
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::InvalidConfig(format!(
                "backoff multiplier must be finite and at least 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        Ok(())
    }

    fn grow(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.backoff_multiplier)
            .unwrap_or(Duration::MAX)
    }
}

/// Retry budget and current delay, carried across failures
///
/// Each [`next_delay`](Backoff::next_delay) spends one attempt and grows the
/// delay for the following one. Once the budget is spent it returns `None`.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    remaining: u32,
    delay: Duration,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            remaining: policy.max_attempts,
            delay: policy.initial_delay,
        }
    }

    /// Delay to wait before the next attempt, or `None` when exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let delay = self.delay;
        self.delay = self.policy.grow(delay);
        Some(delay)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Restore the full budget and the initial delay
    pub fn reset(&mut self) {
        *self = Self::new(self.policy);
    }
}

/// Run `op` under `policy`, sleeping the calling thread between attempts
pub fn retry<T, F>(policy: &RetryPolicy, op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    retry_with_sleep(policy, thread::sleep, op)
}

/// [`retry`] with a caller-supplied sleep
///
/// After `max_attempts` recoverable failures one last attempt is made and
/// its result is returned as is, so `op` runs at most `max_attempts + 1`
/// times.
pub fn retry_with_sleep<T, F, S>(policy: &RetryPolicy, mut sleep: S, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
    S: FnMut(Duration),
{
    let mut backoff = Backoff::new(*policy);

    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_recoverable() => match backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        error = %e,
                        delay_secs = delay.as_secs_f64(),
                        remaining = backoff.remaining(),
                        "Operation failed, retrying"
                    );
                    sleep(delay);
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}
