//! Signal aggregation: decides when the combined reading is complete and
//! fresh enough to dispatch.
//!
//! Every declared signal keeps its latest value, the timestamp of that value
//! and a *baseline*: the timestamp it carried when it last contributed to a
//! dispatch. A dispatch fires only when every signal has a value and every
//! signal's timestamp is at least `window` past its baseline. The baselines
//! are then moved forward to the current timestamps, so one chatty signal
//! cannot re-fire a combination while its siblings are stale.
//!
//! All timestamps are milliseconds on a caller-supplied monotonic clock.

use crate::error::Result;
use crate::key::{build_key, CombinationKey};
use crate::signal::SignalDomains;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_WINDOW: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SignalEntry {
    value: Option<String>,
    updated_at_ms: u64,
    baseline_ms: Option<u64>,
}

/// A complete, fresh reading to hand to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchDecision {
    /// Signal names in canonical order at the time of the decision.
    pub order: Vec<String>,
    pub values: BTreeMap<String, String>,
    pub decided_at_ms: u64,
}

impl DispatchDecision {
    pub fn key(&self) -> Result<CombinationKey> {
        build_key(&self.values, &self.order)
    }
}

/// Per-signal view used by status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalSnapshot {
    pub name: String,
    pub value: Option<String>,
    pub updated_at_ms: Option<u64>,
    pub baseline_ms: Option<u64>,
}

#[derive(Debug)]
pub struct Aggregator {
    window_ms: u64,
    /// `None` until the first update seeds it.
    table: Option<BTreeMap<String, SignalEntry>>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl Aggregator {
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: window.as_millis() as u64,
            table: None,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Record one signal update and report whether it completes a dispatch.
    ///
    /// An undeclared signal or out-of-domain value is rejected and leaves the
    /// state untouched.
    pub fn update(
        &mut self,
        domains: &SignalDomains,
        signal: &str,
        value: &str,
        now_ms: u64,
    ) -> Result<Option<DispatchDecision>> {
        domains.check(signal, value)?;
        self.record(domains, signal, value, now_ms);
        Ok(self.evaluate(domains, now_ms))
    }

    /// Record several updates sharing one timestamp.
    ///
    /// Every pair is validated before any is applied, so a bad pair rejects
    /// the whole batch. Decisions are evaluated after each pair in order.
    pub fn update_batch(
        &mut self,
        domains: &SignalDomains,
        pairs: &[(String, String)],
        now_ms: u64,
    ) -> Result<Vec<DispatchDecision>> {
        for (signal, value) in pairs {
            domains.check(signal, value)?;
        }
        let mut decisions = Vec::new();
        for (signal, value) in pairs {
            self.record(domains, signal, value, now_ms);
            if let Some(d) = self.evaluate(domains, now_ms) {
                decisions.push(d);
            }
        }
        Ok(decisions)
    }

    /// Current state of every declared signal, in canonical order.
    pub fn snapshot(&self, domains: &SignalDomains) -> Vec<SignalSnapshot> {
        domains
            .iter()
            .map(|d| {
                let entry = self.table.as_ref().and_then(|t| t.get(&d.name));
                SignalSnapshot {
                    name: d.name.clone(),
                    value: entry.and_then(|e| e.value.clone()),
                    updated_at_ms: entry.filter(|e| e.value.is_some()).map(|e| e.updated_at_ms),
                    baseline_ms: entry.and_then(|e| e.baseline_ms),
                }
            })
            .collect()
    }

    fn record(&mut self, domains: &SignalDomains, signal: &str, value: &str, now_ms: u64) {
        self.reconcile(domains);
        if let Some(entry) = self.table.as_mut().and_then(|t| t.get_mut(signal)) {
            entry.value = Some(value.to_string());
            entry.updated_at_ms = now_ms;
        }
    }

    /// Seed the table on first use, then keep exactly one entry per declared
    /// signal as declarations change. A recorded value that is no longer in
    /// its domain is forgotten.
    fn reconcile(&mut self, domains: &SignalDomains) {
        let table = self.table.get_or_insert_with(BTreeMap::new);
        table.retain(|name, _| domains.get(name).is_some());
        for d in domains.iter() {
            let entry = table.entry(d.name.clone()).or_default();
            if entry.value.as_deref().is_some_and(|v| !d.contains(v)) {
                *entry = SignalEntry::default();
            }
        }
    }

    fn evaluate(&mut self, domains: &SignalDomains, now_ms: u64) -> Option<DispatchDecision> {
        let window_ms = self.window_ms;
        let table = self.table.as_mut()?;
        if table.is_empty() {
            return None;
        }

        let ready = table.values().all(|e| {
            e.value.is_some()
                && e.baseline_ms
                    .map_or(true, |b| e.updated_at_ms.saturating_sub(b) >= window_ms)
        });
        if !ready {
            return None;
        }

        let mut values = BTreeMap::new();
        for (name, entry) in table.iter_mut() {
            entry.baseline_ms = Some(entry.updated_at_ms);
            if let Some(v) = &entry.value {
                values.insert(name.clone(), v.clone());
            }
        }
        let decision = DispatchDecision {
            order: domains.names(),
            values,
            decided_at_ms: now_ms,
        };
        tracing::debug!(values = ?decision.values, "signal set complete");
        Some(decision)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
