use axum::extract::{Path, Query, State};
use axum::Json;
use handbridge_core::action::Action;

use crate::error::AppError;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct MappingQuery {
    #[serde(default)]
    pub all: bool,
}

#[derive(serde::Deserialize)]
pub struct PutMappingBody {
    /// A combination key, or a pattern with `*` components.
    pub key: String,
    pub actions: Vec<String>,
}

/// GET /api/mapping[?all=true]
///
/// Entries in canonical key order. With `all`, every key in the key space
/// is listed and unmapped keys carry `null` actions.
pub async fn get_mapping(
    State(app): State<AppState>,
    Query(q): Query<MappingQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let entries: Vec<serde_json::Value> = if q.all {
        app.store
            .full_table()
            .into_iter()
            .map(|(key, actions)| serde_json::json!({ "key": key, "actions": actions }))
            .collect()
    } else {
        app.store
            .mapping()
            .into_iter()
            .map(|(key, actions)| serde_json::json!({ "key": key, "actions": actions }))
            .collect()
    };
    Ok(Json(serde_json::json!({
        "signals": app.store.domains().names(),
        "entries": entries,
    })))
}

/// PUT /api/mapping — map every key matching `key` to `actions`.
pub async fn put_mapping(
    State(app): State<AppState>,
    Json(body): Json<PutMappingBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        let actions = Action::parse_all(&body.actions)?;
        let updated = store.put_mapping(&body.key, actions)?;
        Ok::<_, handbridge_core::BridgeError>(serde_json::json!({ "updated": updated }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// DELETE /api/mapping/{key} — unmap every key matching the pattern.
pub async fn delete_mapping(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        let removed = store.remove_mapping(&key)?;
        Ok::<_, handbridge_core::BridgeError>(serde_json::json!({ "removed": removed }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}
