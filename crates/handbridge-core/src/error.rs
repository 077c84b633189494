use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("not initialized: run 'handbridge init'")]
    NotInitialized,

    #[error("signal not found: {0}")]
    SignalNotFound(String),

    #[error("signal already exists: {0}")]
    SignalExists(String),

    #[error("invalid name '{0}': must be 1-64 characters of [A-Za-z0-9_.-]")]
    InvalidName(String),

    #[error("invalid value '{value}' for signal '{signal}'")]
    InvalidValue { signal: String, value: String },

    #[error("signal '{0}' must declare at least one value")]
    EmptyDomain(String),

    #[error("duplicate value '{value}' in signal '{signal}'")]
    DuplicateValue { signal: String, value: String },

    #[error("invalid combination key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("no combination matches '{0}'")]
    NoMatchingKeys(String),

    #[error("invalid action '{token}': {reason}")]
    InvalidAction { token: String, reason: String },

    #[error("key space of {size} combinations exceeds the limit of {limit}")]
    KeySpaceTooLarge { size: usize, limit: usize },

    #[error("no signals declared")]
    NoSignals,

    #[error("batch has {signals} signals but {values} values")]
    BatchMismatch { signals: usize, values: usize },

    #[error("trigger not found: {0}")]
    TriggerNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
