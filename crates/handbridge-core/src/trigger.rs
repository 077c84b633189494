//! EMG trigger: turns a raw sample window into a discrete signal value.
//!
//! The detector is a threshold gate with a refractory period, not a
//! classifier. It fires when the mean-removed RMS of the window is strictly
//! above `threshold` and at least `refractory_ms` have passed since the last
//! time it fired.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_refractory_ms")]
    pub refractory_ms: u64,
}

fn default_window_ms() -> u64 {
    100
}

fn default_threshold() -> f64 {
    0.15
}

fn default_refractory_ms() -> u64 {
    300
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            threshold: default_threshold(),
            refractory_ms: default_refractory_ms(),
        }
    }
}

impl TriggerConfig {
    /// Number of samples in one window at `sample_rate` Hz.
    pub fn window_len(&self, sample_rate: f64) -> usize {
        (sample_rate * self.window_ms as f64 / 1000.0).round().max(0.0) as usize
    }
}

/// Population RMS of `samples` after subtracting their mean.
pub fn centered_rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let power = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
    power.sqrt()
}

/// Threshold gate with a refractory period. A detector that has never fired
/// is not refractory, so the first qualifying window after startup fires.
#[derive(Debug, Clone)]
pub struct TriggerDetector {
    cfg: TriggerConfig,
    last_fire_s: Option<f64>,
}

impl TriggerDetector {
    pub fn new(cfg: TriggerConfig) -> Self {
        Self {
            cfg,
            last_fire_s: None,
        }
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.cfg
    }

    /// Returns true if this window fires the trigger. `now_s` is seconds on a
    /// monotonic clock. The sample rate is accepted for symmetry with the
    /// sampler; the decision itself only needs the window.
    pub fn process(&mut self, samples: &[f64], _sample_rate: f64, now_s: f64) -> bool {
        if samples.is_empty() {
            return false;
        }
        if centered_rms(samples) <= self.cfg.threshold {
            return false;
        }
        if let Some(last) = self.last_fire_s {
            if (now_s - last) * 1000.0 < self.cfg.refractory_ms as f64 {
                return false;
            }
        }
        self.last_fire_s = Some(now_s);
        true
    }
}

// ---------------------------------------------------------------------------
// Binding a trigger to a signal
// ---------------------------------------------------------------------------

/// How a trigger's output becomes a signal value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerOutput {
    /// `"true"` for a window that fired, `"false"` otherwise.
    #[default]
    Boolean,
    /// A counter that advances on every fire, wrapping at `modulus`; every
    /// window reports the current count (`"0"`, `"1"`, ...).
    Cycle { modulus: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerBinding {
    /// Signal fed by this trigger.
    pub signal: String,
    #[serde(flatten)]
    pub detector: TriggerConfig,
    #[serde(default)]
    pub output: TriggerOutput,
}

impl TriggerBinding {
    /// Every value this binding can emit; they must all be in the bound
    /// signal's domain.
    pub fn values(&self) -> Vec<String> {
        match self.output {
            TriggerOutput::Boolean => vec!["true".to_string(), "false".to_string()],
            TriggerOutput::Cycle { modulus } => (0..modulus).map(|i| i.to_string()).collect(),
        }
    }
}

/// Result of feeding one window through a [`BoundTrigger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerReading {
    pub signal: String,
    pub value: String,
    pub fired: bool,
}

/// A detector plus the runtime state of its output mapping.
#[derive(Debug, Clone)]
pub struct BoundTrigger {
    binding: TriggerBinding,
    detector: TriggerDetector,
    count: u32,
    last: Option<TriggerReading>,
}

impl BoundTrigger {
    pub fn new(binding: TriggerBinding) -> Self {
        let detector = TriggerDetector::new(binding.detector.clone());
        Self {
            binding,
            detector,
            count: 0,
            last: None,
        }
    }

    pub fn signal(&self) -> &str {
        &self.binding.signal
    }

    pub fn binding(&self) -> &TriggerBinding {
        &self.binding
    }

    /// The reading produced by the most recent [`feed`](Self::feed).
    pub fn last(&self) -> Option<&TriggerReading> {
        self.last.as_ref()
    }

    pub fn feed(&mut self, samples: &[f64], sample_rate: f64, now_s: f64) -> TriggerReading {
        let fired = self.detector.process(samples, sample_rate, now_s);
        let value = match self.binding.output {
            TriggerOutput::Boolean => fired.to_string(),
            TriggerOutput::Cycle { modulus } => {
                if fired {
                    self.count = (self.count + 1) % modulus.max(1);
                }
                self.count.to_string()
            }
        };
        let reading = TriggerReading {
            signal: self.binding.signal.clone(),
            value,
            fired,
        };
        self.last = Some(reading.clone());
        reading
    }
}
