//! In-memory idempotency cache: 24-hour TTL, bounded capacity with
//! least-recently-used eviction. Sufficient for a single-process
//! deployment; a durable variant can replace it behind the same calls.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const IDEMPOTENCY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

struct Entry {
    response: CachedResponse,
    stored_at: Instant,
    last_used: Instant,
}

pub struct IdempotencyCache {
    entries: Mutex<HashMap<String, Entry>>,
    capacity: usize,
}

impl IdempotencyCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        self.get_at(key, Instant::now())
    }

    pub fn put(&self, key: &str, response: CachedResponse) {
        self.put_at(key, response, Instant::now());
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<CachedResponse> {
        let mut entries = self.entries.lock();
        let expired = entries
            .get(key)
            .map(|e| now.duration_since(e.stored_at) >= IDEMPOTENCY_TTL)?;
        if expired {
            entries.remove(key);
            return None;
        }
        let entry = entries.get_mut(key)?;
        entry.last_used = now;
        Some(entry.response.clone())
    }

    fn put_at(&self, key: &str, response: CachedResponse, now: Instant) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity && !entries.contains_key(key) {
            let victim = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                entries.remove(&victim);
            }
        }
        entries.insert(
            key.to_string(),
            Entry {
                response,
                stored_at: now,
                last_used: now,
            },
        );
    }
}
