//! Actions executed by the dispatcher.
//!
//! Mappings persist actions as short tokens (`delay:500`, `next_servo`,
//! `fist`). Tokens are parsed into [`Action`] once, when a mapping is loaded
//! or written; the dispatcher only ever sees the typed form.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Pause the dispatch sequence.
    Delay(Duration),
    /// Select actuator `index` (1-based).
    SelectActuator(u8),
    IncrementActuator,
    DecrementActuator,
    /// Move the selected actuator by `delta` position units.
    AdjustAngle(i32),
    /// Ask the remote hand to run a named gesture.
    ExecuteGesture(String),
}

impl Action {
    /// Short label used in logs and dispatch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Delay(_) => "delay",
            Action::SelectActuator(_) => "select_servo",
            Action::IncrementActuator => "next_servo",
            Action::DecrementActuator => "prev_servo",
            Action::AdjustAngle(_) => "adjust_angle",
            Action::ExecuteGesture(_) => "gesture",
        }
    }

    /// Parse a list of tokens, failing on the first bad one.
    pub fn parse_all<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Action>> {
        tokens.iter().map(|t| t.as_ref().parse()).collect()
    }
}

fn invalid(token: &str, reason: impl Into<String>) -> BridgeError {
    BridgeError::InvalidAction {
        token: token.to_string(),
        reason: reason.into(),
    }
}

fn number<T: FromStr>(token: &str, arg: &str) -> Result<T> {
    arg.trim()
        .parse()
        .map_err(|_| invalid(token, format!("'{arg}' is not a valid number")))
}

impl FromStr for Action {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        if token.is_empty() {
            return Err(invalid(s, "empty action"));
        }
        let (head, arg) = match token.split_once(':') {
            Some((h, a)) => (h.trim(), Some(a)),
            None => (token, None),
        };
        match (head, arg) {
            ("delay", Some(ms)) => Ok(Action::Delay(Duration::from_millis(number(token, ms)?))),
            ("select_servo", Some(i)) => Ok(Action::SelectActuator(number(token, i)?)),
            ("next_servo", None) => Ok(Action::IncrementActuator),
            ("prev_servo", None) => Ok(Action::DecrementActuator),
            ("increase_angle", Some(d)) => Ok(Action::AdjustAngle(number::<u16>(token, d)? as i32)),
            ("decrease_angle", Some(d)) => {
                Ok(Action::AdjustAngle(-(number::<u16>(token, d)? as i32)))
            }
            ("gesture", Some(name)) if !name.trim().is_empty() => {
                Ok(Action::ExecuteGesture(name.trim().to_string()))
            }
            ("delay" | "select_servo" | "increase_angle" | "decrease_angle" | "gesture", _) => {
                Err(invalid(token, format!("'{head}' needs an argument")))
            }
            ("next_servo" | "prev_servo", Some(_)) => {
                Err(invalid(token, format!("'{head}' takes no argument")))
            }
            _ if token.contains(':') => Err(invalid(token, format!("unknown action '{head}'"))),
            _ => Ok(Action::ExecuteGesture(token.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Delay(d) => write!(f, "delay:{}", d.as_millis()),
            Action::SelectActuator(i) => write!(f, "select_servo:{i}"),
            Action::IncrementActuator => f.write_str("next_servo"),
            Action::DecrementActuator => f.write_str("prev_servo"),
            Action::AdjustAngle(d) if *d < 0 => write!(f, "decrease_angle:{}", d.unsigned_abs()),
            Action::AdjustAngle(d) => write!(f, "increase_angle:{d}"),
            Action::ExecuteGesture(name) if is_bare_gesture(name) => f.write_str(name),
            Action::ExecuteGesture(name) => write!(f, "gesture:{name}"),
        }
    }
}

/// Heads that never parse back as a bare gesture name.
const RESERVED: &[&str] = &[
    "delay",
    "select_servo",
    "next_servo",
    "prev_servo",
    "increase_angle",
    "decrease_angle",
    "gesture",
];

fn is_bare_gesture(name: &str) -> bool {
    !name.contains(':') && !RESERVED.contains(&name)
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
