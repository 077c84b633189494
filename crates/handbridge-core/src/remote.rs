//! Clients for the two external services the dispatcher drives.
//!
//! - Actuator position service: `GET {base}/positions`, `POST {base}/positions`
//!   with a `{ "<index>": position }` body.
//! - Gesture service: `POST {base}/execute {gesture, thumb_clearance}`,
//!   `GET {base}/gestures`.
//!
//! Both are blocking; they run on the dispatch worker thread, never on the
//! ingestion runtime.

use reqwest::blocking::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Actuator index → position.
pub type Positions = BTreeMap<u8, i32>;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// Could not talk to the service at all (connect, timeout, bad body).
    #[error("{service} unreachable: {reason}")]
    Transport {
        service: &'static str,
        reason: String,
    },

    /// The service answered with a non-success status.
    #[error("{service} rejected request with status {status}")]
    Rejected { service: &'static str, status: u16 },
}

impl RemoteError {
    /// Transport failures abort a dispatch; rejections do not.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RemoteError::Transport { .. })
    }

    fn transport(service: &'static str, err: impl std::fmt::Display) -> Self {
        RemoteError::Transport {
            service,
            reason: err.to_string(),
        }
    }
}

pub trait ActuatorService: Send {
    fn positions(&self) -> Result<Positions, RemoteError>;
    fn set_positions(&self, positions: &Positions) -> Result<(), RemoteError>;
}

pub trait GestureService: Send {
    fn execute(&self, gesture: &str, thumb_clearance: bool) -> Result<(), RemoteError>;
}

fn build_client(timeout: Duration) -> Result<Client, RemoteError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RemoteError::transport("http client", e))
}

fn check_status(service: &'static str, resp: &reqwest::blocking::Response) -> Result<(), RemoteError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(RemoteError::Rejected {
            service,
            status: status.as_u16(),
        })
    }
}

// ---------------------------------------------------------------------------
// Actuator position service
// ---------------------------------------------------------------------------

const ACTUATORS: &str = "actuator service";

pub struct HttpActuatorService {
    client: Client,
    base_url: String,
}

impl HttpActuatorService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/positions", self.base_url)
    }
}

impl ActuatorService for HttpActuatorService {
    fn positions(&self) -> Result<Positions, RemoteError> {
        let resp = self
            .client
            .get(self.url())
            .send()
            .map_err(|e| RemoteError::transport(ACTUATORS, e))?;
        check_status(ACTUATORS, &resp)?;
        resp.json::<Positions>()
            .map_err(|e| RemoteError::transport(ACTUATORS, e))
    }

    fn set_positions(&self, positions: &Positions) -> Result<(), RemoteError> {
        let resp = self
            .client
            .post(self.url())
            .json(positions)
            .send()
            .map_err(|e| RemoteError::transport(ACTUATORS, e))?;
        check_status(ACTUATORS, &resp)
    }
}

// ---------------------------------------------------------------------------
// Gesture service
// ---------------------------------------------------------------------------

const GESTURES: &str = "gesture service";

#[derive(Serialize)]
struct ExecuteBody<'a> {
    gesture: &'a str,
    thumb_clearance: bool,
}

pub struct HttpGestureService {
    client: Client,
    base_url: String,
}

impl HttpGestureService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Gestures the remote hand knows about, as the service reports them.
    pub fn gestures(&self) -> Result<serde_json::Value, RemoteError> {
        let resp = self
            .client
            .get(format!("{}/gestures", self.base_url))
            .send()
            .map_err(|e| RemoteError::transport(GESTURES, e))?;
        check_status(GESTURES, &resp)?;
        resp.json().map_err(|e| RemoteError::transport(GESTURES, e))
    }
}

impl GestureService for HttpGestureService {
    fn execute(&self, gesture: &str, thumb_clearance: bool) -> Result<(), RemoteError> {
        let resp = self
            .client
            .post(format!("{}/execute", self.base_url))
            .json(&ExecuteBody {
                gesture,
                thumb_clearance,
            })
            .send()
            .map_err(|e| RemoteError::transport(GESTURES, e))?;
        check_status(GESTURES, &resp)
    }
}
