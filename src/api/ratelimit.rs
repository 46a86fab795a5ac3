//! Fixed-window request counters keyed by client address.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::common::quota::Quota;

/// Number of tracked windows above which expired entries are swept.
const SWEEP_THRESHOLD: usize = 4096;

/// Minimum spacing between two sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A request refused because `quota` is spent until `retry_after` elapses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    pub quota: Quota,
    pub retry_after: Duration,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
struct WindowKey {
    scope: &'static str,
    client: String,
    slot: usize,
}

#[derive(Copy, Clone, Debug)]
struct Window {
    started: Instant,
    length: Duration,
    count: u32,
}

impl Window {
    fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.length
    }
}

#[derive(Debug, Default)]
struct Windows {
    map: HashMap<WindowKey, Window>,
    next_sweep: Option<Instant>,
}

impl Windows {
    /// Drop expired windows, at most once per [`SWEEP_INTERVAL`].
    fn sweep(&mut self, now: Instant) {
        if self.map.len() <= SWEEP_THRESHOLD {
            return;
        }
        if self.next_sweep.is_some_and(|at| now < at) {
            return;
        }
        let before = self.map.len();
        self.map.retain(|_, window| !window.expired(now));
        self.next_sweep = Some(now + SWEEP_INTERVAL);
        log::debug!(
            "Swept {} expired rate limit windows, {} remain",
            before - self.map.len(),
            self.map.len()
        );
    }
}

/// In-memory fixed-window counters shared by every request handler.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<Windows>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit or refuse one request from `client` against every quota of `scope`.
    pub fn check(&self, scope: &'static str, client: &str, quotas: &[Quota]) -> Result<(), Rejection> {
        self.check_at(scope, client, quotas, Instant::now())
    }

    /// Same as [`RateLimiter::check`] with an explicit clock reading.
    ///
    /// Checking and counting happen under one lock so concurrent requests from
    /// the same client can never be admitted past a quota.
    pub fn check_at(
        &self,
        scope: &'static str,
        client: &str,
        quotas: &[Quota],
        now: Instant,
    ) -> Result<(), Rejection> {
        let mut guard = self.windows.lock();
        guard.sweep(now);
        let windows = &mut guard.map;

        for (slot, quota) in quotas.iter().enumerate() {
            let key = WindowKey {
                scope,
                client: client.to_string(),
                slot,
            };
            let window = windows.entry(key).or_insert(Window {
                started: now,
                length: quota.window(),
                count: 0,
            });
            if window.expired(now) {
                window.started = now;
                window.length = quota.window();
                window.count = 0;
            }
            if window.count >= quota.max_requests {
                let elapsed = now.saturating_duration_since(window.started);
                return Err(Rejection {
                    quota: *quota,
                    retry_after: window.length.saturating_sub(elapsed),
                });
            }
        }

        for slot in 0..quotas.len() {
            let key = WindowKey {
                scope,
                client: client.to_string(),
                slot,
            };
            if let Some(window) = windows.get_mut(&key) {
                window.count += 1;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.windows.lock().map.len()
    }
}
