//! Integration tests for the inspection pipeline.
//!
//! ## Test Modules
//!
//! - **config_tests**: configuration loading and validation
//! - **middleware_tests**: full-router tests driving the inspection
//!   middleware, rate limiting, response shaping and telemetry
//!
//! Unit tests for the detectors, the rate limiter and address resolution
//! live next to their implementations.

pub mod middleware_tests;
