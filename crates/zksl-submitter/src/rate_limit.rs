//! Fixed-window rate limiting keyed by client address.

use crate::error::{ApiError, ApiResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

struct Window {
    started_at: Instant,
    count: u32,
}

pub struct RateLimiter {
    windows: Mutex<HashMap<IpAddr, Window>>,
    max: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max,
            window,
        }
    }

    pub fn check(&self, addr: IpAddr) -> ApiResult<()> {
        self.check_at(addr, Instant::now())
    }

    fn check_at(&self, addr: IpAddr, now: Instant) -> ApiResult<()> {
        let mut windows = self.windows.lock();
        let entry = windows.entry(addr).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }
        if entry.count >= self.max {
            return Err(ApiError::RateLimitExceeded);
        }
        entry.count = entry.count.saturating_add(1);
        Ok(())
    }
}
