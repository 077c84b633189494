use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use handbridge_core::error::BridgeError;

// ---------------------------------------------------------------------------
// Internal sentinel for explicit 400 Bad Request errors
// ---------------------------------------------------------------------------

/// Carries an explicit 400 through the `anyhow::Error` chain, for handlers
/// where a core error that normally maps elsewhere is the caller's fault.
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }

    pub(crate) fn join(e: tokio::task::JoinError) -> Self {
        Self(anyhow::anyhow!("task join error: {e}"))
    }
}

fn status_for(e: &BridgeError) -> StatusCode {
    match e {
        BridgeError::NotInitialized => StatusCode::BAD_REQUEST,
        BridgeError::SignalNotFound(_) | BridgeError::TriggerNotFound(_) => StatusCode::NOT_FOUND,
        BridgeError::SignalExists(_) => StatusCode::CONFLICT,
        BridgeError::InvalidName(_)
        | BridgeError::InvalidValue { .. }
        | BridgeError::EmptyDomain(_)
        | BridgeError::DuplicateValue { .. }
        | BridgeError::InvalidKey { .. }
        | BridgeError::InvalidAction { .. }
        | BridgeError::BatchMismatch { .. }
        | BridgeError::KeySpaceTooLarge { .. } => StatusCode::BAD_REQUEST,
        BridgeError::NoMatchingKeys(_) | BridgeError::NoSignals => StatusCode::UNPROCESSABLE_ENTITY,
        BridgeError::Io(_) | BridgeError::Yaml(_) | BridgeError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<BadRequestError>().is_some() {
            StatusCode::BAD_REQUEST
        } else if let Some(e) = self.0.downcast_ref::<BridgeError>() {
            status_for(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(e: BridgeError) -> StatusCode {
        AppError(e.into()).into_response().status()
    }

    #[test]
    fn signal_not_found_maps_to_404() {
        assert_eq!(status(BridgeError::SignalNotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(BridgeError::TriggerNotFound("x".into())), StatusCode::NOT_FOUND);
    }

    #[test]
    fn signal_exists_maps_to_409() {
        assert_eq!(status(BridgeError::SignalExists("mode".into())), StatusCode::CONFLICT);
    }

    #[test]
    fn invalid_input_maps_to_400() {
        assert_eq!(
            status(BridgeError::InvalidValue {
                signal: "mode".into(),
                value: "9".into()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(BridgeError::InvalidAction {
                token: "delay:x".into(),
                reason: "bad".into()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(BridgeError::BatchMismatch { signals: 2, values: 1 }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn no_matching_keys_maps_to_422() {
        assert_eq!(
            status(BridgeError::NoMatchingKeys("*".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn io_error_maps_to_500() {
        let io_err = std::io::Error::other("disk full");
        assert_eq!(status(BridgeError::Io(io_err)), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn bad_request_constructor_overrides_mapping() {
        let err = AppError::bad_request("unknown signal: elbow");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn non_core_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
