use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
///
/// Always 200. `status` is `degraded` when the AI credential or the
/// similarity backend is not configured. An embedding model that has not been
/// used yet reports `loaded: false` but is not degraded.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let gemini_configured = state.extractor.is_configured();
    let similarity = state.scorer.status();
    let status = if gemini_configured && similarity.configured {
        "ok"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME"),
        "gemini_configured": gemini_configured,
        "similarity": similarity,
        "store": state.store.backend(),
        "max_files": state.config.max_files,
    }))
}
