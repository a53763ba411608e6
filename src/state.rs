use std::sync::Arc;

use crate::config::AppConfig;
use crate::detect::AttackDetector;
use crate::middleware::RateLimiter;
use crate::telemetry::{AttackCounters, LogTelemetry, SecurityTelemetry};

/// The shared application state.
///
/// Holds the compiled detectors, the attempt tracker and the configuration,
/// cloneable for use with Axum's request extraction system. Detectors are
/// immutable after construction and shared without locking.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sql_detector: Arc<AttackDetector>,
    pub xss_detector: Arc<AttackDetector>,
    pub rate_limiter: RateLimiter,
    pub counters: AttackCounters,
    /// Optional block-event sink, consulted only when telemetry is enabled.
    pub telemetry: Option<Arc<dyn SecurityTelemetry>>,
}

impl AppState {
    /// Compile the detectors from the configured pattern lists and set up
    /// the rate limiter. Fails when a custom pattern does not compile.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let shield = &config.shield;
        let sql_detector = Arc::new(AttackDetector::sql_injection(&shield.custom_sql_patterns)?);
        let xss_detector = Arc::new(AttackDetector::xss(&shield.custom_xss_patterns)?);
        let rate_limiter = RateLimiter::new(shield.max_attempts, shield.time_window());
        let telemetry: Option<Arc<dyn SecurityTelemetry>> = if shield.enable_telemetry {
            Some(Arc::new(LogTelemetry))
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            sql_detector,
            xss_detector,
            rate_limiter,
            counters: AttackCounters::new(),
            telemetry,
        })
    }

    /// Replace the telemetry sink, e.g. with an external collector.
    pub fn with_telemetry(mut self, sink: Arc<dyn SecurityTelemetry>) -> Self {
        self.telemetry = Some(sink);
        self
    }
}
