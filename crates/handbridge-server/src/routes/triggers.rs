use axum::extract::{Path, State};
use axum::Json;
use handbridge_core::error::BridgeError;
use handbridge_core::trigger::{TriggerBinding, TriggerReading};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::AppError;
use crate::routes::ingest::rejected;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SampleWindow {
    pub samples: Vec<f64>,
    pub sample_rate: f64,
}

#[derive(Serialize)]
struct TriggerView<'a> {
    #[serde(flatten)]
    binding: &'a TriggerBinding,
    last: Option<&'a TriggerReading>,
}

/// GET /api/triggers — configured trigger bindings with their last reading.
pub async fn list_triggers(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let triggers = app.triggers.lock().await;
    let views: BTreeMap<&str, TriggerView<'_>> = triggers
        .iter()
        .map(|(name, t)| {
            let view = TriggerView {
                binding: t.binding(),
                last: t.last(),
            };
            (name.as_str(), view)
        })
        .collect();
    Ok(Json(serde_json::to_value(&views)?))
}

/// POST /api/triggers/{name} — run one sample window through the named
/// trigger and feed its output to the aggregator as a signal reading.
pub async fn feed_trigger(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<SampleWindow>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !(body.sample_rate.is_finite() && body.sample_rate > 0.0) {
        return Err(AppError::bad_request("sample_rate must be a positive number"));
    }

    let reading = {
        let mut triggers = app.triggers.lock().await;
        let trigger = triggers
            .get_mut(&name)
            .ok_or_else(|| BridgeError::TriggerNotFound(name.clone()))?;
        trigger.feed(&body.samples, body.sample_rate, app.now_s())
    };

    let domains = app.store.domains();
    let mut aggregator = app.aggregator.lock().await;
    let decision = aggregator
        .update(&domains, &reading.signal, &reading.value, app.now_ms())
        .map_err(rejected)?;
    let dispatched = decision.is_some();
    if let Some(decision) = decision {
        app.enqueue(decision);
    }
    drop(aggregator);

    Ok(Json(serde_json::json!({
        "trigger": name,
        "signal": reading.signal,
        "value": reading.value,
        "fired": reading.fired,
        "dispatched": dispatched,
    })))
}
