//! Per-client-host request rate limiting.
//!
//! A single mutex-guarded map counts requests per host within the
//! current one-minute window. A background task swaps in a fresh map
//! every minute, so counts never decrement except through the reset.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::broadcast;

/// Default per-host window ceiling.
pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: u32 = 120;

/// Outcome of a rate check, carrying the host's current count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Pass(u32),
    Limited(u32),
}

/// Sliding one-minute request counter keyed by client host.
pub struct RateLimiter {
    counts: Mutex<HashMap<String, u32>>,
    max_per_minute: u32,
}

impl RateLimiter {
    /// Creates a limiter; a zero maximum falls back to the default.
    pub fn new(max_per_minute: u32) -> RateLimiter {
        let max_per_minute = if max_per_minute == 0 {
            DEFAULT_MAX_REQUESTS_PER_MINUTE
        } else {
            max_per_minute
        };
        RateLimiter {
            counts: Mutex::new(HashMap::new()),
            max_per_minute,
        }
    }

    pub fn max_per_minute(&self) -> u32 {
        self.max_per_minute
    }

    /// Records one request from `host`. Requests 1..=max in a window
    /// pass; the count stops advancing once the host is limited.
    pub fn check(&self, host: &str) -> RateDecision {
        let mut counts = self.counts.lock();
        match counts.get_mut(host) {
            None => {
                counts.insert(host.to_string(), 1);
                RateDecision::Pass(1)
            }
            Some(count) if *count >= self.max_per_minute => RateDecision::Limited(*count),
            Some(count) => {
                *count += 1;
                RateDecision::Pass(*count)
            }
        }
    }

    /// Swaps the window map for a fresh one.
    pub fn reset(&self) {
        *self.counts.lock() = HashMap::new();
    }

    /// Periodic reset loop; runs until the shutdown channel fires.
    pub async fn run_reset_loop(&self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(60)) => self.reset(),
                _ = shutdown.recv() => break,
            }
        }
    }
}
