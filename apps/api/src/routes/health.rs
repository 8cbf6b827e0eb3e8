use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "jobvoice",
        "model": state.llm.model(),
        "tts_backend": state.synthesizer.backend(),
        "credential_configured": state.config.groq_api_key.is_some(),
        "active_sessions": state.sessions.len().await,
    }))
}
