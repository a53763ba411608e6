use axum::http::HeaderMap;
use std::net::IpAddr;

/// Resolve the client address used as the rate-limiting identity: proxy
/// headers first, then transport metadata. Returns `None` when no identity
/// can be established; callers skip rate limiting for such requests.
pub fn client_ip(headers: &HeaderMap, fallback: Option<IpAddr>) -> Option<IpAddr> {
    if let Some(h) = headers.get("x-forwarded-for").and_then(|hv| hv.to_str().ok()) {
        if let Some(first) = h.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    if let Some(h) = headers.get("x-real-ip").and_then(|hv| hv.to_str().ok()) {
        if let Ok(ip) = h.parse::<IpAddr>() {
            return Some(ip);
        }
    }
    fallback
}
