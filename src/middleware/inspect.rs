//! Request inspection orchestration.
//!
//! Per request: check the rate limiter, then walk every readable input value
//! in a fixed order — query parameters, form fields, header values, cookie
//! values — and stop at the first one a detector flags. A flagged value
//! tracks an attempt against the client address, logs a structured security
//! event and turns into a block response; a clean traversal hands the
//! request (body reinstated) to the inner service.
//!
//! Baseline security headers are NOT applied here: the
//! [`super::security_headers`] layer wraps this one, so they land on every
//! response including blocks.

use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use tracing::{error, warn};
use url::form_urlencoded;

use crate::error::AppError;
use crate::middleware::ip::client_ip;
use crate::state::AppState;
use crate::types::{BlockReason, BlockTaxonomy, Detection, ThreatCategory, Verdict};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
/// Upper bound for buffering form bodies during inspection; matches the
/// router's `DefaultBodyLimit`.
const MAX_FORM_BODY_BYTES: usize = 10 * 1024 * 1024;

pub async fn inspect_request_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    state.counters.inc_inspected();

    let transport_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    let ip = client_ip(req.headers(), transport_ip);

    match evaluate_request(&state, ip, req).await {
        Ok((req, Verdict::Allow)) => next.run(req).await,
        Ok((_, Verdict::Block(reason))) => blocked_response(&state, reason),
        Err(err) => err.into_response(),
    }
}

/// Produce the verdict for one request, together with the (possibly rebuilt)
/// request so an allowed one can continue down the pipeline.
async fn evaluate_request(
    state: &AppState,
    ip: Option<IpAddr>,
    req: Request,
) -> Result<(Request, Verdict), AppError> {
    let shield = &state.config.shield;

    // Addresses that exhausted their attempts are rejected before any
    // content inspection. Requests without a resolvable identity skip this
    // gate entirely.
    if shield.enable_rate_limiting {
        if let Some(ip) = ip {
            if state.rate_limiter.is_blocked(ip) {
                error!(ip = %ip, "address blocked due to rate limit violations");
                let reason = BlockReason {
                    taxonomy: BlockTaxonomy::RateLimit,
                    pattern: format!("exceeded {} attempts", shield.max_attempts),
                    sample: ip.to_string(),
                };
                return Ok((req, Verdict::Block(reason)));
            }
        }
    }

    if !shield.enable_sql_injection_protection && !shield.enable_xss_protection {
        return Ok((req, Verdict::Allow));
    }

    let (req, detection) = inspect_request_content(state, req).await?;
    match detection {
        Some(found) => {
            // An attack attempt counts toward rate-limit exhaustion even
            // while the address is not currently blocked.
            if let Some(ip) = ip {
                state.rate_limiter.track_request(ip);
            }
            log_security_event(ip, req.uri().path(), &found);
            Ok((req, Verdict::Block(found.into())))
        }
        None => Ok((req, Verdict::Allow)),
    }
}

/// Walk the request's input sources in fixed order and stop at the first
/// malicious value. Form bodies are buffered and reinstated so downstream
/// extractors still see them.
async fn inspect_request_content(
    state: &AppState,
    req: Request,
) -> Result<(Request, Option<Detection>), AppError> {
    // 1. Query parameters, in declared order.
    if let Some(query) = req.uri().query() {
        for (_, value) in form_urlencoded::parse(query.as_bytes()) {
            if let Some(found) = inspect_value(state, &value) {
                return Ok((req, Some(found)));
            }
        }
    }

    // 2. Form fields, only for form-encoded bodies. Other content types
    // contribute no values here.
    let req = if is_form_content_type(req.headers()) {
        let (parts, body) = req.into_parts();
        let bytes = axum::body::to_bytes(body, MAX_FORM_BODY_BYTES)
            .await
            .map_err(|e| AppError::BadRequest(format!("unreadable form body: {}", e)))?;

        let mut found = None;
        for (_, value) in form_urlencoded::parse(&bytes) {
            if let Some(detection) = inspect_value(state, &value) {
                found = Some(detection);
                break;
            }
        }

        let req = Request::from_parts(parts, Body::from(bytes));
        if found.is_some() {
            return Ok((req, found));
        }
        req
    } else {
        req
    };

    // 3. Header values, in declared order. Values that are not valid UTF-8
    // are inspected lossily rather than skipped.
    for (_, value) in req.headers() {
        let value = String::from_utf8_lossy(value.as_bytes());
        if let Some(found) = inspect_value(state, &value) {
            return Ok((req, Some(found)));
        }
    }

    // 4. Cookie values.
    for value in cookie_values(req.headers()) {
        if let Some(found) = inspect_value(state, &value) {
            return Ok((req, Some(found)));
        }
    }

    Ok((req, None))
}

/// SQL patterns are checked before XSS patterns; the first hit decides.
fn inspect_value(state: &AppState, value: &str) -> Option<Detection> {
    let shield = &state.config.shield;
    if shield.enable_sql_injection_protection {
        if let Some(found) = state.sql_detector.analyze(value) {
            return Some(found);
        }
    }
    if shield.enable_xss_protection {
        return state.xss_detector.analyze(value);
    }
    None
}

fn is_form_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
        .unwrap_or(false)
}

/// Values of all cookies, across however many `Cookie` headers carry them.
fn cookie_values(headers: &HeaderMap) -> Vec<String> {
    let mut values = Vec::new();
    for header_value in headers.get_all(header::COOKIE) {
        let raw = String::from_utf8_lossy(header_value.as_bytes()).into_owned();
        for pair in raw.split(';') {
            if let Some((_, value)) = pair.split_once('=') {
                values.push(value.trim().to_string());
            }
        }
    }
    values
}

fn log_security_event(ip: Option<IpAddr>, path: &str, found: &Detection) {
    let ip = ip.map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".to_string());
    match found.category {
        ThreatCategory::SqlInjection => error!(
            category = %found.category,
            ip = %ip,
            path = %path,
            pattern = %found.pattern,
            sample = %found.sample,
            "malicious input detected"
        ),
        ThreatCategory::Xss => warn!(
            category = %found.category,
            ip = %ip,
            path = %path,
            pattern = %found.pattern,
            sample = %found.sample,
            "malicious input detected"
        ),
    }
}

/// Shape the response for a block: 403 with the configured plain-text
/// message, or a redirect to the honeypot target when one is configured.
fn blocked_response(state: &AppState, reason: BlockReason) -> Response {
    state.counters.record_block(reason.taxonomy);

    if state.config.shield.enable_telemetry {
        if let Some(telemetry) = &state.telemetry {
            telemetry.record_block(&reason);
        }
    }

    let shield = &state.config.shield;
    if let Some(honeypot) = shield.honeypot_url.as_deref() {
        let location =
            HeaderValue::from_str(honeypot).unwrap_or_else(|_| HeaderValue::from_static("/"));
        return (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
    }

    (
        StatusCode::FORBIDDEN,
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
        shield.blocked_response_message.clone(),
    )
        .into_response()
}
