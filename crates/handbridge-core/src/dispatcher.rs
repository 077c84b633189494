//! Executes mapped action sequences against the remote services.
//!
//! A [`Dispatcher`] owns the only mutable runtime state of the action side:
//! the currently selected actuator, always within `[1, N]`. It is driven by
//! a single worker, so two dispatches never interleave.
//!
//! Failure policy:
//! - a transport failure aborts the rest of the sequence and is reported
//!   with the index of the failed action;
//! - a rejection (non-success status, out-of-range selection, actuator
//!   missing from the position map) is recorded and the sequence continues.
//!
//! Nothing is rolled back.

use crate::action::Action;
use crate::remote::{ActuatorService, GestureService, RemoteError};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_ACTUATOR_COUNT: u8 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    Done,
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub action: Action,
    #[serde(flatten)]
    pub outcome: ActionOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchFailure {
    /// Position of the failed action in the sequence.
    pub index: usize,
    pub action: Action,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub results: Vec<ActionResult>,
    pub failure: Option<DispatchFailure>,
}

impl DispatchReport {
    pub fn rejected(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ActionOutcome::Rejected { .. }))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// What the dispatch worker did with one decision.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchRecord {
    pub key: String,
    pub actions: usize,
    pub report: DispatchReport,
    pub selected_actuator: u8,
    pub finished_at: DateTime<Utc>,
}

pub struct Dispatcher<A, G> {
    actuators: A,
    gestures: G,
    count: u8,
    selected: u8,
    thumb_clearance: bool,
}

impl<A: ActuatorService, G: GestureService> Dispatcher<A, G> {
    /// `count` actuators, indexed from 1. A count of zero is treated as one.
    pub fn new(actuators: A, gestures: G, count: u8) -> Self {
        Self {
            actuators,
            gestures,
            count: count.max(1),
            selected: 1,
            thumb_clearance: false,
        }
    }

    pub fn with_thumb_clearance(mut self, thumb_clearance: bool) -> Self {
        self.thumb_clearance = thumb_clearance;
        self
    }

    pub fn selected(&self) -> u8 {
        self.selected
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    /// Run `actions` in order. Blocks for the duration of any delays and
    /// remote calls.
    pub fn dispatch(&mut self, actions: &[Action]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for (index, action) in actions.iter().enumerate() {
            match self.execute(action) {
                Ok(outcome) => {
                    if let ActionOutcome::Rejected { reason } = &outcome {
                        tracing::warn!(action = %action, "action rejected: {reason}");
                    }
                    report.results.push(ActionResult {
                        action: action.clone(),
                        outcome,
                    });
                }
                Err(e) if !e.is_fatal() => {
                    tracing::warn!(action = %action, "action rejected: {e}");
                    report.results.push(ActionResult {
                        action: action.clone(),
                        outcome: ActionOutcome::Rejected {
                            reason: e.to_string(),
                        },
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        action = %action,
                        "dispatch aborted at action {index}, {} skipped: {e}",
                        actions.len() - index - 1
                    );
                    report.failure = Some(DispatchFailure {
                        index,
                        action: action.clone(),
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }
        report
    }

    fn execute(&mut self, action: &Action) -> Result<ActionOutcome, RemoteError> {
        match action {
            Action::Delay(d) => {
                std::thread::sleep(*d);
                Ok(ActionOutcome::Done)
            }
            Action::SelectActuator(i) => {
                if (1..=self.count).contains(i) {
                    self.selected = *i;
                    Ok(ActionOutcome::Done)
                } else {
                    Ok(ActionOutcome::Rejected {
                        reason: format!(
                            "actuator {i} out of range 1..={}, keeping {}",
                            self.count, self.selected
                        ),
                    })
                }
            }
            Action::IncrementActuator => {
                self.selected = self.selected % self.count + 1;
                Ok(ActionOutcome::Done)
            }
            Action::DecrementActuator => {
                self.selected = if self.selected <= 1 {
                    self.count
                } else {
                    self.selected - 1
                };
                Ok(ActionOutcome::Done)
            }
            // Read-modify-write with no compare-and-swap: another client
            // moving actuators between the GET and the POST is overwritten.
            Action::AdjustAngle(delta) => {
                let mut positions = self.actuators.positions()?;
                let Some(pos) = positions.get_mut(&self.selected) else {
                    return Ok(ActionOutcome::Rejected {
                        reason: format!("actuator {} not reported by service", self.selected),
                    });
                };
                *pos = pos.saturating_add(*delta);
                self.actuators.set_positions(&positions)?;
                Ok(ActionOutcome::Done)
            }
            Action::ExecuteGesture(name) => {
                self.gestures.execute(name, self.thumb_clearance)?;
                tracing::info!(gesture = %name, "gesture executed");
                Ok(ActionOutcome::Done)
            }
        }
    }
}
