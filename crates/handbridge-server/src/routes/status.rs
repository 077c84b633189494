use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/status — aggregator table, dispatch worker and clock.
pub async fn get_status(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let domains = app.store.domains();
    let signals = app.aggregator.lock().await.snapshot(&domains);
    let window_ms = app.config.aggregator.debounce_ms;
    let worker = app.worker_status();

    Ok(Json(serde_json::json!({
        "now_ms": app.now_ms(),
        "debounce_ms": window_ms,
        "signals": signals,
        "worker": worker,
    })))
}
