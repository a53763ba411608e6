use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Form, Json,
};

use crate::state::AppState;

// Health check endpoint - lightweight, no inspection-relevant payload
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Version/Build info endpoint (JSON)
pub async fn version() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// Counters endpoint: returns JSON snapshot
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.counters.snapshot())
}

// Demo form consumer; anything malicious is stopped by the middleware
// before this handler runs.
pub async fn submit(Form(fields): Form<HashMap<String, String>>) -> impl IntoResponse {
    (StatusCode::OK, format!("received {} fields", fields.len()))
}
