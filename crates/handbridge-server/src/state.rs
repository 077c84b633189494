use crate::worker::{self, SharedStatus, WorkerStatus};
use handbridge_core::aggregator::{Aggregator, DispatchDecision};
use handbridge_core::config::Config;
use handbridge_core::mapping::MappingStore;
use handbridge_core::trigger::BoundTrigger;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub store: Arc<MappingStore>,
    /// Held across validation, readiness, baseline update and enqueueing.
    pub aggregator: Arc<Mutex<Aggregator>>,
    pub triggers: Arc<Mutex<BTreeMap<String, BoundTrigger>>>,
    pub worker: SharedStatus,
    dispatch_tx: mpsc::UnboundedSender<DispatchDecision>,
    started: Instant,
}

impl AppState {
    /// State wired to the HTTP actuator and gesture services from `config`.
    pub fn new(root: PathBuf, config: Config) -> Self {
        let (state, rx) = Self::unstarted(root, config);
        if let Err(e) = worker::spawn_http(&state.config, state.store.clone(), rx, state.worker.clone())
        {
            tracing::error!("could not spawn dispatch worker: {e}");
        }
        state
    }

    /// State whose dispatch queue is not yet drained; the caller starts a
    /// worker on the returned receiver.
    pub fn unstarted(
        root: PathBuf,
        config: Config,
    ) -> (Self, mpsc::UnboundedReceiver<DispatchDecision>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = Arc::new(MappingStore::open(&root));
        let aggregator = Aggregator::new(config.aggregator.window());
        let triggers = config
            .triggers
            .iter()
            .map(|(name, binding)| (name.clone(), BoundTrigger::new(binding.clone())))
            .collect();
        let state = Self {
            root,
            config: Arc::new(config),
            store,
            aggregator: Arc::new(Mutex::new(aggregator)),
            triggers: Arc::new(Mutex::new(triggers)),
            worker: Arc::new(RwLock::new(WorkerStatus::default())),
            dispatch_tx: tx,
            started: Instant::now(),
        };
        (state, rx)
    }

    /// Milliseconds since the server started; the aggregator's clock.
    pub fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Seconds since the server started; the trigger detectors' clock.
    pub fn now_s(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Queue a decision for the worker. Call with the aggregator lock held so
    /// decisions are queued in the order they were made.
    pub fn enqueue(&self, decision: DispatchDecision) {
        if self.dispatch_tx.send(decision).is_err() {
            tracing::warn!("dispatch worker is gone; decision dropped");
        }
    }

    pub fn worker_status(&self) -> WorkerStatus {
        self.worker.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
