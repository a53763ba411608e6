//! Attack counters and the optional telemetry collaborator.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::types::{BlockReason, BlockTaxonomy};

/// Collaborator notified about every blocked request. Implementations must
/// be cheap and infallible; the middleware calls them best-effort and an
/// absent sink is not an error.
pub trait SecurityTelemetry: Send + Sync {
    fn record_block(&self, reason: &BlockReason);
}

/// Default sink: forwards block events to the log.
pub struct LogTelemetry;

impl SecurityTelemetry for LogTelemetry {
    fn record_block(&self, reason: &BlockReason) {
        info!(
            taxonomy = %reason.taxonomy,
            pattern = %reason.pattern,
            sample = %reason.sample,
            "attack telemetry"
        );
    }
}

/// Operational counters for monitoring.
#[derive(Clone)]
pub struct AttackCounters {
    pub requests_inspected: Arc<AtomicU64>,
    pub requests_blocked: Arc<AtomicU64>,
    pub sql_injection_blocks: Arc<AtomicU64>,
    pub xss_blocks: Arc<AtomicU64>,
    pub rate_limit_blocks: Arc<AtomicU64>,
}

impl AttackCounters {
    pub fn new() -> Self {
        Self {
            requests_inspected: Arc::new(AtomicU64::new(0)),
            requests_blocked: Arc::new(AtomicU64::new(0)),
            sql_injection_blocks: Arc::new(AtomicU64::new(0)),
            xss_blocks: Arc::new(AtomicU64::new(0)),
            rate_limit_blocks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn inc_inspected(&self) {
        self.requests_inspected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_block(&self, taxonomy: BlockTaxonomy) {
        self.requests_blocked.fetch_add(1, Ordering::Relaxed);
        let per_taxonomy = match taxonomy {
            BlockTaxonomy::SqlInjection => &self.sql_injection_blocks,
            BlockTaxonomy::Xss => &self.xss_blocks,
            BlockTaxonomy::RateLimit => &self.rate_limit_blocks,
        };
        per_taxonomy.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            requests_inspected: self.requests_inspected.load(Ordering::Relaxed),
            requests_blocked: self.requests_blocked.load(Ordering::Relaxed),
            sql_injection_blocks: self.sql_injection_blocks.load(Ordering::Relaxed),
            xss_blocks: self.xss_blocks.load(Ordering::Relaxed),
            rate_limit_blocks: self.rate_limit_blocks.load(Ordering::Relaxed),
        }
    }
}

impl Default for AttackCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct CountersSnapshot {
    pub requests_inspected: u64,
    pub requests_blocked: u64,
    pub sql_injection_blocks: u64,
    pub xss_blocks: u64,
    pub rate_limit_blocks: u64,
}
