use crate::error::{BridgeError, Result};
use crate::paths;
use crate::signal::SignalDomains;
use crate::trigger::{TriggerBinding, TriggerOutput};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: String) -> Self {
        Self {
            level: WarnLevel::Warning,
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            level: WarnLevel::Error,
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    7000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// AggregatorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Minimum time a signal must advance past its last dispatch before it
    /// can contribute to another one.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    1000
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl AggregatorConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ---------------------------------------------------------------------------
// ActuatorConfig / GestureConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorConfig {
    #[serde(default = "default_actuator_count")]
    pub count: u8,
    #[serde(default = "default_actuator_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_actuator_count() -> u8 {
    crate::dispatcher::DEFAULT_ACTUATOR_COUNT
}

fn default_actuator_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout_ms() -> u64 {
    2000
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            count: default_actuator_count(),
            base_url: default_actuator_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ActuatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    #[serde(default = "default_gesture_url")]
    pub base_url: String,
    #[serde(default)]
    pub thumb_clearance: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_gesture_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            base_url: default_gesture_url(),
            thumb_clearance: false,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl GestureConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub actuators: ActuatorConfig,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub triggers: BTreeMap<String, TriggerBinding>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            aggregator: AggregatorConfig::default(),
            actuators: ActuatorConfig::default(),
            gesture: GestureConfig::default(),
            triggers: BTreeMap::new(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(BridgeError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn trigger(&self, name: &str) -> Result<&TriggerBinding> {
        self.triggers
            .get(name)
            .ok_or_else(|| BridgeError::TriggerNotFound(name.to_string()))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check the config on its own and against the declared signals.
    pub fn validate(&self, domains: &SignalDomains) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.actuators.base_url.trim().is_empty() {
            warnings.push(ConfigWarning::error(
                "actuators.base_url is empty".to_string(),
            ));
        }
        if self.gesture.base_url.trim().is_empty() {
            warnings.push(ConfigWarning::error("gesture.base_url is empty".to_string()));
        }
        if self.actuators.count == 0 {
            warnings.push(ConfigWarning::error(
                "actuators.count is 0; at least one actuator is required".to_string(),
            ));
        }
        if self.aggregator.debounce_ms == 0 {
            warnings.push(ConfigWarning::warning(
                "aggregator.debounce_ms is 0; every complete update will dispatch".to_string(),
            ));
        }

        for (name, binding) in &self.triggers {
            if binding.detector.threshold < 0.0 {
                warnings.push(ConfigWarning::error(format!(
                    "trigger '{name}': threshold {} is negative",
                    binding.detector.threshold
                )));
            }
            if binding.detector.window_ms == 0 {
                warnings.push(ConfigWarning::warning(format!(
                    "trigger '{name}': window_ms is 0"
                )));
            }
            if let TriggerOutput::Cycle { modulus: 0 } = binding.output {
                warnings.push(ConfigWarning::error(format!(
                    "trigger '{name}': cycle modulus must be at least 1"
                )));
            }

            let Some(domain) = domains.get(&binding.signal) else {
                warnings.push(ConfigWarning::error(format!(
                    "trigger '{name}' feeds undeclared signal '{}'",
                    binding.signal
                )));
                continue;
            };
            let missing: Vec<String> = binding
                .values()
                .into_iter()
                .filter(|v| !domain.contains(v))
                .collect();
            if !missing.is_empty() {
                warnings.push(ConfigWarning::warning(format!(
                    "trigger '{name}' can emit {} outside signal '{}'",
                    missing.join(", "),
                    binding.signal
                )));
            }
        }

        warnings
    }
}
