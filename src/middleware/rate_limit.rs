//! Fixed-window attempt tracking per client address.
//!
//! Each address gets a record anchored at its first tracked attempt. Attempts
//! accumulate against that anchor until the window elapses, at which point the
//! record is purged wholesale and the next attempt opens a fresh window. Once
//! the attempt threshold is reached inside a window the address stays blocked
//! for the remainder of that window; there is no partial decay.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Per-address record. `window_start` is fixed at creation and never moved
/// by later increments.
#[derive(Debug, Clone, Copy)]
struct RateRecord {
    count: u32,
    window_start: Instant,
}

/// Thread-safe attempt tracker shared across all in-flight inspections.
///
/// All operations are synchronous and hold the lock only for the duration of
/// the map access, so the limiter can be called from async request handlers
/// without blocking concerns.
#[derive(Clone)]
pub struct RateLimiter {
    records: Arc<Mutex<HashMap<IpAddr, RateRecord>>>,
    max_attempts: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            max_attempts,
            window,
        }
    }

    /// Record one attempt for `ip`: creates a record with `count = 1` on
    /// first sight, otherwise increments the existing count in place. The
    /// window anchor is left untouched on increment.
    pub fn track_request(&self, ip: IpAddr) {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records
            .entry(ip)
            .and_modify(|record| record.count += 1)
            .or_insert_with(|| RateRecord { count: 1, window_start: Instant::now() });
    }

    /// Whether `ip` has exhausted its attempts for the current window.
    ///
    /// Every call first sweeps the whole map, dropping records older than the
    /// window regardless of which address is being queried.
    pub fn is_blocked(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.retain(|_, record| now.duration_since(record.window_start) <= self.window);
        match records.get(&ip) {
            Some(record) => {
                record.count >= self.max_attempts
                    && now.duration_since(record.window_start) < self.window
            }
            None => false,
        }
    }

    /// Attempt count currently on record for `ip`, if any.
    pub fn tracked_count(&self, ip: IpAddr) -> Option<u32> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.get(&ip).map(|record| record.count)
    }
}
