use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service status, version and whether the AI endpoints can be used.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-forge-api",
        "aiConfigured": state.ai.is_configured(),
        "sessions": state.sessions.len().await,
    }))
}
