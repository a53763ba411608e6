//! # Schildwall
//!
//! Request-inspection security layer for axum services: classifies inbound
//! request data as SQL-injection or XSS attack attempts using compiled
//! pattern sets, and suppresses repeat offenders with per-address rate
//! limiting.
//!
//! ## Architecture
//!
//! The crate is built using:
//! - **Axum**: HTTP server, routing and the middleware seam
//! - **Regex**: compiled, case-insensitive attack signatures
//! - **Tokio**: async runtime for the hosting service
//! - **Tracing**: structured security event logging
//!
//! ## Core Components
//!
//! - [`config`]: layered application configuration
//! - [`detect`]: pattern-based SQL-injection and XSS detectors
//! - [`error`]: centralized error handling and HTTP error responses
//! - [`middleware`]: inspection orchestration, rate limiting, security headers
//! - [`routes`]: demo HTTP endpoints
//! - [`state`]: shared application state
//! - [`telemetry`]: attack counters and the optional telemetry sink
//! - [`types`]: detection results, block taxonomy, verdicts
//!
//! ## Request Flow
//!
//! Every response carries a fixed set of baseline security headers. A
//! request from a rate-limited address is rejected before any content
//! inspection. Otherwise query parameters, form fields, header values and
//! cookie values are walked in that order and the first malicious value
//! blocks the request with a 403 (or a honeypot redirect), counts against
//! the address's rate-limit window and is logged with a severity keyed by
//! threat category.

pub mod config;
pub mod detect;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod tests;
