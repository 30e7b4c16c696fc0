//! GET /health - service health check

use crate::AppState;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "topfive-server",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": (Utc::now() - state.startup_time).num_seconds(),
        "cache_enabled": state.cache.is_enabled(),
    }))
}
