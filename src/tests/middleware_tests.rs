#[cfg(test)]
mod tests {
    use axum::middleware::{from_fn, from_fn_with_state};
    use axum::routing::{get, post};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt; // for .collect()
    use std::net::IpAddr;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::middleware;
    use crate::routes;
    use crate::state::AppState;
    use crate::telemetry::SecurityTelemetry;
    use crate::types::{BlockReason, BlockTaxonomy};

    const CLIENT: &str = "203.0.113.7";

    #[derive(Default)]
    struct RecordingTelemetry {
        events: Mutex<Vec<BlockReason>>,
    }

    impl SecurityTelemetry for RecordingTelemetry {
        fn record_block(&self, reason: &BlockReason) {
            self.events.lock().unwrap().push(reason.clone());
        }
    }

    fn test_state(mutate: impl FnOnce(&mut AppConfig)) -> AppState {
        let mut cfg = AppConfig::default();
        mutate(&mut cfg);
        AppState::from_config(cfg).unwrap()
    }

    fn build_app(state: &AppState) -> Router {
        Router::new()
            .route("/healthz", get(routes::healthz))
            .route("/metrics", get(routes::metrics))
            .route("/submit", post(routes::submit))
            .route("/echo", post(|| async { "ok" }))
            .with_state(state.clone())
            .layer(from_fn_with_state(
                state.clone(),
                middleware::inspect::inspect_request_middleware,
            ))
            .layer(from_fn(middleware::security_headers::security_headers_middleware))
    }

    fn get_with_ip(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", CLIENT)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn benign_request_passes_with_baseline_headers() {
        let state = test_state(|_| {});
        let app = build_app(&state);

        let response = app.oneshot(get_with_ip("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-xss-protection"], "1; mode=block");
        assert_eq!(headers["content-security-policy"], "default-src 'self'");
        assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    }

    #[tokio::test]
    async fn sql_injection_in_query_is_blocked_and_tracked() {
        let state = test_state(|_| {});
        let app = build_app(&state);

        let response = app.oneshot(get_with_ip("/healthz?q=1%20OR%201%3D1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "Request blocked for security reasons");

        let ip: IpAddr = CLIENT.parse().unwrap();
        assert_eq!(state.rate_limiter.tracked_count(ip), Some(1));
        assert_eq!(state.counters.snapshot().sql_injection_blocks, 1);
    }

    #[tokio::test]
    async fn blocked_response_still_carries_baseline_headers() {
        let state = test_state(|_| {});
        let app = build_app(&state);

        let response = app.oneshot(get_with_ip("/healthz?q=%3Cscript%3Ealert(1)%3C%2Fscript%3E"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(state.counters.snapshot().xss_blocks, 1);
    }

    #[tokio::test]
    async fn sql_detector_runs_before_xss_detector() {
        let state = test_state(|_| {});
        let app = build_app(&state);

        // Matches the SQL keyword blacklist and the script-tag pattern.
        let uri = "/healthz?q=%3Cscript%3ESELECT%20a%20FROM%20b%3C%2Fscript%3E";
        let response = app.oneshot(get_with_ip(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let snapshot = state.counters.snapshot();
        assert_eq!(snapshot.sql_injection_blocks, 1);
        assert_eq!(snapshot.xss_blocks, 0);
    }

    #[tokio::test]
    async fn query_values_are_inspected_before_header_values() {
        let state = test_state(|cfg| cfg.shield.enable_telemetry = true);
        let sink = Arc::new(RecordingTelemetry::default());
        let state = state.with_telemetry(sink.clone());
        let app = build_app(&state);

        // The query value only matches an XSS pattern, the header value only
        // a SQL marker; the query must win.
        let request = Request::builder()
            .uri("/healthz?q=%3Cscript%3Ex%3C%2Fscript%3E")
            .header("x-forwarded-for", CLIENT)
            .header("x-probe", "1; DROP TABLE users")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].taxonomy, BlockTaxonomy::Xss);
    }

    #[tokio::test]
    async fn form_fields_are_inspected_only_for_form_content() {
        let state = test_state(|_| {});
        let app = build_app(&state);

        let malicious_body = "comment=%3Cscript%3Ealert(1)%3C%2Fscript%3E";
        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(malicious_body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Same bytes under a non-form content type contribute no values.
        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", "text/plain")
            .body(Body::from(malicious_body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn buffered_form_body_is_reinstated_for_the_handler() {
        let state = test_state(|_| {});
        let app = build_app(&state);

        let request = Request::builder()
            .method("POST")
            .uri("/submit")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("name=alice&city=berlin"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "received 2 fields");
    }

    #[tokio::test]
    async fn cookie_borne_payloads_are_blocked() {
        let state = test_state(|_| {});
        let app = build_app(&state);

        let request = Request::builder()
            .uri("/healthz")
            .header("cookie", "session=javascript:alert(1)")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(state.counters.snapshot().xss_blocks, 1);
    }

    #[tokio::test]
    async fn repeated_attacks_exhaust_the_rate_limit() {
        let state = test_state(|cfg| cfg.shield.max_attempts = 2);
        let app = build_app(&state);
        let ip: IpAddr = CLIENT.parse().unwrap();

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(get_with_ip("/healthz?q=1%20OR%201%3D1"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }
        assert_eq!(state.rate_limiter.tracked_count(ip), Some(2));

        // Even a benign request from the exhausted address is rejected now,
        // without any content inspection.
        let response = app.oneshot(get_with_ip("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let snapshot = state.counters.snapshot();
        assert_eq!(snapshot.sql_injection_blocks, 2);
        assert_eq!(snapshot.rate_limit_blocks, 1);
    }

    #[tokio::test]
    async fn missing_identity_skips_rate_limiting_but_not_inspection() {
        let state = test_state(|cfg| cfg.shield.max_attempts = 2);
        let app = build_app(&state);

        for _ in 0..3 {
            let request = Request::builder()
                .uri("/healthz?q=1%20OR%201%3D1")
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }

        let snapshot = state.counters.snapshot();
        assert_eq!(snapshot.sql_injection_blocks, 3);
        assert_eq!(snapshot.rate_limit_blocks, 0);
    }

    #[tokio::test]
    async fn disabled_protections_skip_content_inspection() {
        let state = test_state(|cfg| {
            cfg.shield.enable_sql_injection_protection = false;
            cfg.shield.enable_xss_protection = false;
            cfg.shield.enable_rate_limiting = false;
        });
        let app = build_app(&state);

        let response = app.oneshot(get_with_ip("/healthz?q=1%20OR%201%3D1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        // Baseline headers are independent of the inspection toggles.
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn sql_toggle_off_leaves_xss_detection_active() {
        let state = test_state(|cfg| cfg.shield.enable_sql_injection_protection = false);
        let app = build_app(&state);

        let response = app
            .clone()
            .oneshot(get_with_ip("/healthz?q=1%20OR%201%3D1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get_with_ip("/healthz?q=%3Cscript%3Ex%3C%2Fscript%3E"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn honeypot_redirect_replaces_the_block_body() {
        let state = test_state(|cfg| {
            cfg.shield.honeypot_url = Some("https://honeypot.example/login".to_string());
        });
        let app = build_app(&state);

        let response = app.oneshot(get_with_ip("/healthz?q=1%20OR%201%3D1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "https://honeypot.example/login");
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn telemetry_sink_receives_block_events_when_enabled() {
        let state = test_state(|cfg| cfg.shield.enable_telemetry = true);
        let sink = Arc::new(RecordingTelemetry::default());
        let state = state.with_telemetry(sink.clone());
        let app = build_app(&state);

        let response = app.oneshot(get_with_ip("/healthz?q=1%20OR%201%3D1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].taxonomy, BlockTaxonomy::SqlInjection);
        assert_eq!(events[0].sample, "1 OR 1=1");
    }

    #[tokio::test]
    async fn telemetry_sink_is_ignored_when_disabled() {
        let state = test_state(|_| {});
        let sink = Arc::new(RecordingTelemetry::default());
        let state = state.with_telemetry(sink.clone());
        let app = build_app(&state);

        let response = app.oneshot(get_with_ip("/healthz?q=1%20OR%201%3D1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn custom_patterns_extend_detection() {
        let state = test_state(|cfg| {
            cfg.shield.custom_sql_patterns = vec![r"load\s+data\s+infile".to_string()];
        });
        let app = build_app(&state);

        let response = app
            .oneshot(get_with_ip("/healthz?q=load%20data%20infile"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(state.counters.snapshot().sql_injection_blocks, 1);
    }

    #[tokio::test]
    async fn metrics_route_reports_counters() {
        let state = test_state(|_| {});
        let app = build_app(&state);

        let response = app
            .clone()
            .oneshot(get_with_ip("/healthz?q=1%20OR%201%3D1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.oneshot(get_with_ip("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["requests_blocked"], 1);
        assert_eq!(json["sql_injection_blocks"], 1);
        assert_eq!(json["requests_inspected"], 2);
    }
}
