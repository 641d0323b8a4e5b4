//! Monotonic time source for keepalive scheduling and backoff waits

use std::thread;
use std::time::{Duration, Instant};

/// Source of "now" for the ping deadline, and of reconnect backoff sleeps
pub trait Clock: Clone {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration);
}

/// Wall-clock backed [`Clock`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
