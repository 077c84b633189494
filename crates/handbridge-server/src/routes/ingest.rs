use axum::extract::State;
use axum::Json;
use handbridge_core::error::BridgeError;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

/// Either one reading or a batch of parallel arrays:
///
/// ```text
/// { "signal": "finger1", "value": "flexed" }
/// { "signal": ["finger1", "mode"], "value": ["flexed", "1"] }
/// ```
///
/// Values may be sent as strings, numbers or booleans; they are compared
/// against the domain as text.
#[derive(Debug, Deserialize)]
pub struct SignalPayload {
    signal: Value,
    value: Value,
}

fn scalar(v: &Value, field: &str) -> Result<String, AppError> {
    match v {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(AppError::bad_request(format!(
            "'{field}' must be a string, number or boolean, got {other}"
        ))),
    }
}

impl SignalPayload {
    fn into_pairs(self) -> Result<Vec<(String, String)>, AppError> {
        match (&self.signal, &self.value) {
            (Value::Array(signals), Value::Array(values)) => {
                if signals.len() != values.len() {
                    return Err(BridgeError::BatchMismatch {
                        signals: signals.len(),
                        values: values.len(),
                    }
                    .into());
                }
                signals
                    .iter()
                    .zip(values)
                    .map(|(s, v)| Ok((scalar(s, "signal")?, scalar(v, "value")?)))
                    .collect()
            }
            (Value::Array(_), _) | (_, Value::Array(_)) => Err(AppError::bad_request(
                "'signal' and 'value' must both be arrays or both be scalars",
            )),
            (s, v) => Ok(vec![(scalar(s, "signal")?, scalar(v, "value")?)]),
        }
    }
}

/// An undeclared signal is a bad reading, not a missing resource.
pub(crate) fn rejected(e: BridgeError) -> AppError {
    match e {
        BridgeError::SignalNotFound(name) => AppError::bad_request(format!("unknown signal: {name}")),
        other => other.into(),
    }
}

/// POST /api/signals/receive (also /receive_signals)
///
/// Validates, records and evaluates the reading under the aggregator lock.
/// Complete readings are queued for the dispatch worker before the lock is
/// released; the response never waits for actions to run.
pub async fn receive_signals(
    State(app): State<AppState>,
    Json(body): Json<SignalPayload>,
) -> Result<Json<Value>, AppError> {
    let pairs = body.into_pairs()?;
    let domains = app.store.domains();

    let mut aggregator = app.aggregator.lock().await;
    let decisions = aggregator
        .update_batch(&domains, &pairs, app.now_ms())
        .map_err(rejected)?;
    let dispatched = decisions.len();
    for decision in decisions {
        app.enqueue(decision);
    }
    drop(aggregator);

    Ok(Json(serde_json::json!({
        "accepted": pairs.len(),
        "dispatched": dispatched,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(v: Value) -> SignalPayload {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn single_reading() {
        let pairs = payload(serde_json::json!({"signal": "mode", "value": 2}))
            .into_pairs()
            .unwrap();
        assert_eq!(pairs, vec![("mode".to_string(), "2".to_string())]);
    }

    #[test]
    fn batch_reading() {
        let pairs = payload(serde_json::json!({
            "signal": ["finger1", "bicep"],
            "value": ["flexed", true]
        }))
        .into_pairs()
        .unwrap();
        assert_eq!(pairs[1], ("bicep".to_string(), "true".to_string()));
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        assert!(payload(serde_json::json!({"signal": ["a", "b"], "value": ["x"]}))
            .into_pairs()
            .is_err());
        assert!(payload(serde_json::json!({"signal": ["a"], "value": "x"}))
            .into_pairs()
            .is_err());
        assert!(payload(serde_json::json!({"signal": null, "value": "x"}))
            .into_pairs()
            .is_err());
    }
}
