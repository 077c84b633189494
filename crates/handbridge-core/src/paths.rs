use crate::error::{BridgeError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// File constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "handbridge.yaml";
pub const SIGNALS_FILE: &str = "signals.json";
pub const MAPPING_FILE: &str = "mapping.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn signals_path(root: &Path) -> PathBuf {
    root.join(SIGNALS_FILE)
}

pub fn mapping_path(root: &Path) -> PathBuf {
    root.join(MAPPING_FILE)
}

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap())
}

/// Validate a signal name or signal value.
///
/// The allowed alphabet excludes `|` (the key delimiter) and `*` (the pattern
/// wildcard), so every key renders to exactly one combination.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 || !name_re().is_match(name) {
        return Err(BridgeError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["finger1", "notflexed", "0", "left.bicep", "mode-2", "A_b"] {
            validate_name(name).unwrap_or_else(|_| panic!("expected valid: {name}"));
        }
    }

    #[test]
    fn invalid_names() {
        for name in ["", "has space", "a|b", "*", "flex*", "ünïcode"] {
            assert!(validate_name(name).is_err(), "expected invalid: {name}");
        }
        assert!(validate_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/hand");
        assert_eq!(config_path(root), PathBuf::from("/tmp/hand/handbridge.yaml"));
        assert_eq!(signals_path(root), PathBuf::from("/tmp/hand/signals.json"));
        assert_eq!(mapping_path(root), PathBuf::from("/tmp/hand/mapping.json"));
    }
}
