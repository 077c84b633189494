use axum::extract::{Path, State};
use axum::Json;
use handbridge_core::signal::SignalDomain;

use crate::error::AppError;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct CreateSignalBody {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(serde::Deserialize)]
pub struct PutSignalBody {
    pub values: Vec<String>,
}

/// GET /api/signals — declared signals in canonical order.
pub async fn list_signals(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let domains = app.store.domains();
    let list: Vec<&SignalDomain> = domains.iter().collect();
    Ok(Json(serde_json::to_value(list)?))
}

/// GET /api/signals/{name}
pub async fn get_signal(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let domains = app.store.domains();
    let domain = domains
        .get(&name)
        .ok_or(handbridge_core::BridgeError::SignalNotFound(name))?;
    Ok(Json(serde_json::to_value(domain)?))
}

/// POST /api/signals — declare a new signal at the end of the order.
pub async fn create_signal(
    State(app): State<AppState>,
    Json(body): Json<CreateSignalBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        let domain = SignalDomain::new(body.name, body.values)?;
        store.create_domain(domain.clone())?;
        Ok::<_, handbridge_core::BridgeError>(serde_json::json!({
            "name": domain.name,
            "values": domain.values,
            "keys": store.full_table().len(),
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// PUT /api/signals/{name} — declare or replace a signal's values. Mapping
/// entries using removed values are dropped.
pub async fn put_signal(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<PutSignalBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        let domain = SignalDomain::new(name, body.values)?;
        store.put_domain(domain.clone())?;
        Ok::<_, handbridge_core::BridgeError>(serde_json::json!({
            "name": domain.name,
            "values": domain.values,
            "mapped": store.mapping().len(),
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// DELETE /api/signals/{name}
pub async fn delete_signal(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        let removed = store.remove_domain(&name)?;
        Ok::<_, handbridge_core::BridgeError>(serde_json::json!({
            "removed": removed.name,
            "mapped": store.mapping().len(),
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}
