//! The dispatch worker: one OS thread that owns the [`Dispatcher`] and
//! drains dispatch decisions in arrival order.
//!
//! Remote calls and delays block this thread only. Ingestion keeps accepting
//! updates while a long sequence runs; queued decisions wait their turn.

use handbridge_core::aggregator::DispatchDecision;
use handbridge_core::config::Config;
use handbridge_core::dispatcher::{DispatchRecord, DispatchReport, Dispatcher};
use handbridge_core::mapping::MappingStore;
use handbridge_core::remote::{
    ActuatorService, GestureService, HttpActuatorService, HttpGestureService, RemoteError,
};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;
use tokio::sync::mpsc::UnboundedReceiver;

/// What the worker has done so far, shared with the status route.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub running: bool,
    pub dispatched: u64,
    pub selected_actuator: u8,
    pub last: Option<DispatchRecord>,
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self {
            running: false,
            dispatched: 0,
            selected_actuator: 1,
            last: None,
        }
    }
}

pub type SharedStatus = Arc<RwLock<WorkerStatus>>;

fn update_status(status: &SharedStatus, f: impl FnOnce(&mut WorkerStatus)) {
    let mut guard = status.write().unwrap_or_else(|e| e.into_inner());
    f(&mut guard);
}

/// Spawn the worker with a dispatcher built by `make` on the worker thread
/// itself. Blocking HTTP clients must not be created or dropped inside the
/// async runtime.
pub fn spawn<A, G, F>(
    make: F,
    store: Arc<MappingStore>,
    rx: UnboundedReceiver<DispatchDecision>,
    status: SharedStatus,
) -> std::io::Result<JoinHandle<()>>
where
    A: ActuatorService + 'static,
    G: GestureService + 'static,
    F: FnOnce() -> Result<Dispatcher<A, G>, RemoteError> + Send + 'static,
{
    std::thread::Builder::new()
        .name("dispatch".to_string())
        .spawn(move || match make() {
            Ok(dispatcher) => run(dispatcher, &store, rx, &status),
            Err(e) => tracing::error!("dispatch worker not started: {e}"),
        })
}

/// Spawn the worker against the HTTP services named in `config`.
pub fn spawn_http(
    config: &Config,
    store: Arc<MappingStore>,
    rx: UnboundedReceiver<DispatchDecision>,
    status: SharedStatus,
) -> std::io::Result<JoinHandle<()>> {
    let actuators = config.actuators.clone();
    let gesture = config.gesture.clone();
    spawn(
        move || {
            let a = HttpActuatorService::new(actuators.base_url.clone(), actuators.timeout())?;
            let g = HttpGestureService::new(gesture.base_url.clone(), gesture.timeout())?;
            Ok(Dispatcher::new(a, g, actuators.count).with_thumb_clearance(gesture.thumb_clearance))
        },
        store,
        rx,
        status,
    )
}

fn run<A: ActuatorService, G: GestureService>(
    mut dispatcher: Dispatcher<A, G>,
    store: &MappingStore,
    mut rx: UnboundedReceiver<DispatchDecision>,
    status: &SharedStatus,
) {
    update_status(status, |s| {
        s.running = true;
        s.selected_actuator = dispatcher.selected();
    });
    tracing::debug!("dispatch worker started");

    while let Some(decision) = rx.blocking_recv() {
        let key = match decision.key() {
            Ok(k) => k,
            Err(e) => {
                tracing::warn!("skipping dispatch: {e}");
                continue;
            }
        };
        let actions = store.lookup(&key);
        let report = if actions.is_empty() {
            tracing::debug!(key = %key, "no actions mapped");
            DispatchReport::default()
        } else {
            tracing::info!(key = %key, actions = actions.len(), "dispatching");
            dispatcher.dispatch(&actions)
        };

        let record = DispatchRecord {
            key: key.to_string(),
            actions: actions.len(),
            report,
            selected_actuator: dispatcher.selected(),
            finished_at: chrono::Utc::now(),
        };
        update_status(status, |s| {
            s.dispatched += 1;
            s.selected_actuator = record.selected_actuator;
            s.last = Some(record);
        });
    }

    update_status(status, |s| s.running = false);
    tracing::debug!("dispatch worker stopped");
}
