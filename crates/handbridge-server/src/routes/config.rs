use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/config — the configuration the server is running with.
///
/// Read-only: edits go through `handbridge.yaml` and a restart.
pub async fn get_config(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::to_value(app.config.as_ref())?))
}

/// GET /api/config/warnings — validation of the running config against the
/// currently declared signals.
pub async fn get_config_warnings(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let warnings = app.config.validate(&app.store.domains());
    Ok(Json(serde_json::to_value(warnings)?))
}
