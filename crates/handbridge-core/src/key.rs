//! Combination keys: the joint state of every declared signal.
//!
//! A key holds one value per signal in canonical (declaration) order and
//! renders as the values joined by `|`, e.g. `flexed|1`. Signal values can
//! never contain `|`, so distinct combinations always render distinctly.

use crate::error::{BridgeError, Result};
use crate::signal::SignalDomains;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub const KEY_DELIMITER: char = '|';
pub const WILDCARD: &str = "*";

// ---------------------------------------------------------------------------
// CombinationKey
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CombinationKey(Vec<String>);

impl CombinationKey {
    pub fn values(&self) -> &[String] {
        &self.0
    }

    /// Parse a rendered key and check it against the declared domains:
    /// one component per signal, each a permitted value of that signal.
    pub fn parse(s: &str, domains: &SignalDomains) -> Result<Self> {
        let components = split_components(s, domains)?;
        for (component, domain) in components.iter().zip(domains.iter()) {
            if !domain.contains(component) {
                return Err(invalid_key(
                    s,
                    format!("'{component}' is not a value of '{}'", domain.name),
                ));
            }
        }
        Ok(Self(components))
    }

    /// Whether every component is still a permitted value, position by
    /// position, under `domains`.
    pub fn is_valid_for(&self, domains: &SignalDomains) -> bool {
        self.0.len() == domains.len()
            && self
                .0
                .iter()
                .zip(domains.iter())
                .all(|(v, d)| d.contains(v))
    }
}

impl fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("|"))
    }
}

impl Serialize for CombinationKey {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CombinationKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(Self(s.split(KEY_DELIMITER).map(str::to_string).collect()))
    }
}

fn invalid_key(key: &str, reason: impl Into<String>) -> BridgeError {
    BridgeError::InvalidKey {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn split_components(s: &str, domains: &SignalDomains) -> Result<Vec<String>> {
    if domains.is_empty() {
        return Err(BridgeError::NoSignals);
    }
    let components: Vec<String> = s
        .split(KEY_DELIMITER)
        .map(|c| c.trim().to_string())
        .collect();
    if components.len() != domains.len() {
        return Err(invalid_key(
            s,
            format!(
                "expected {} components ({}), got {}",
                domains.len(),
                domains.names().join("|"),
                components.len()
            ),
        ));
    }
    Ok(components)
}

// ---------------------------------------------------------------------------
// Key builder
// ---------------------------------------------------------------------------

/// Build the key for a full set of signal values.
///
/// `order` fixes the component order; `values` may come from any map and be
/// filled in any order. A signal in `order` without a value is an error, so a
/// partial state can never produce a key.
pub fn build_key(values: &BTreeMap<String, String>, order: &[String]) -> Result<CombinationKey> {
    if order.is_empty() {
        return Err(BridgeError::NoSignals);
    }
    let mut components = Vec::with_capacity(order.len());
    for name in order {
        let value = values.get(name).ok_or_else(|| {
            invalid_key(
                &order.join("|"),
                format!("signal '{name}' has no value"),
            )
        })?;
        components.push(value.clone());
    }
    Ok(CombinationKey(components))
}

/// Every key in the Cartesian product of the declared domains, first signal
/// varying slowest.
/// Number of keys [`key_space`] would produce, saturating at `usize::MAX`.
pub fn key_space_size(domains: &SignalDomains) -> usize {
    if domains.is_empty() {
        return 0;
    }
    domains
        .iter()
        .fold(1usize, |n, d| n.saturating_mul(d.values.len()))
}

pub fn key_space(domains: &SignalDomains) -> Vec<CombinationKey> {
    if domains.is_empty() {
        return Vec::new();
    }
    let mut keys: Vec<Vec<String>> = vec![Vec::new()];
    for domain in domains.iter() {
        keys = keys
            .into_iter()
            .flat_map(|prefix| {
                domain.values.iter().map(move |v| {
                    let mut next = prefix.clone();
                    next.push(v.clone());
                    next
                })
            })
            .collect();
    }
    keys.into_iter().map(CombinationKey).collect()
}

// ---------------------------------------------------------------------------
// KeyPattern
// ---------------------------------------------------------------------------

/// A key whose components may be `*`, matching any value of that signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    components: Vec<Option<String>>,
}

impl KeyPattern {
    pub fn parse(s: &str, domains: &SignalDomains) -> Result<Self> {
        let raw = split_components(s, domains)?;
        let mut components = Vec::with_capacity(raw.len());
        for (component, domain) in raw.into_iter().zip(domains.iter()) {
            if component == WILDCARD {
                components.push(None);
            } else if domain.contains(&component) {
                components.push(Some(component));
            } else {
                return Err(invalid_key(
                    s,
                    format!("'{component}' is not a value of '{}'", domain.name),
                ));
            }
        }
        Ok(Self { components })
    }

    pub fn matches(&self, key: &CombinationKey) -> bool {
        key.0.len() == self.components.len()
            && self
                .components
                .iter()
                .zip(&key.0)
                .all(|(p, v)| p.as_deref().map_or(true, |p| p == v))
    }

    /// All keys of the declared key space matched by this pattern.
    pub fn expand(&self, domains: &SignalDomains) -> Vec<CombinationKey> {
        key_space(domains)
            .into_iter()
            .filter(|k| self.matches(k))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalDomain;

    fn domains() -> SignalDomains {
        [
            SignalDomain::new("finger1", vec!["flexed".into(), "notflexed".into()]).unwrap(),
            SignalDomain::new("mode", vec!["0".into(), "1".into(), "2".into()]).unwrap(),
        ]
        .into_iter()
        .collect()
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn build_key_follows_order_not_insertion() {
        let order = domains().names();
        let a = values(&[("finger1", "flexed"), ("mode", "1")]);
        let b = values(&[("mode", "1"), ("finger1", "flexed")]);
        let ka = build_key(&a, &order).unwrap();
        let kb = build_key(&b, &order).unwrap();
        assert_eq!(ka, kb);
        assert_eq!(ka.to_string(), "flexed|1");
    }

    #[test]
    fn build_key_refuses_partial_state() {
        let order = domains().names();
        let partial = values(&[("finger1", "flexed")]);
        assert!(matches!(
            build_key(&partial, &order),
            Err(BridgeError::InvalidKey { .. })
        ));
    }

    #[test]
    fn key_space_is_cartesian_product() {
        let keys: Vec<String> = key_space(&domains()).iter().map(|k| k.to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "flexed|0",
                "flexed|1",
                "flexed|2",
                "notflexed|0",
                "notflexed|1",
                "notflexed|2",
            ]
        );
        assert!(key_space(&SignalDomains::new()).is_empty());
    }

    #[test]
    fn parse_validates_arity_and_membership() {
        let d = domains();
        assert_eq!(
            CombinationKey::parse("flexed|2", &d).unwrap().to_string(),
            "flexed|2"
        );
        assert!(CombinationKey::parse("flexed", &d).is_err());
        assert!(CombinationKey::parse("flexed|7", &d).is_err());
        assert!(CombinationKey::parse("flexed|*", &d).is_err());
        assert!(matches!(
            CombinationKey::parse("x", &SignalDomains::new()),
            Err(BridgeError::NoSignals)
        ));
    }

    #[test]
    fn pattern_expands_wildcards() {
        let d = domains();
        let p = KeyPattern::parse("*|1", &d).unwrap();
        let keys: Vec<String> = p.expand(&d).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["flexed|1", "notflexed|1"]);

        let exact = KeyPattern::parse("notflexed|0", &d).unwrap();
        assert_eq!(exact.expand(&d).len(), 1);

        assert_eq!(KeyPattern::parse("*|*", &d).unwrap().expand(&d).len(), 6);
        assert!(KeyPattern::parse("*|9", &d).is_err());
    }

    #[test]
    fn key_validity_tracks_domain_changes() {
        let d = domains();
        let key = CombinationKey::parse("flexed|1", &d).unwrap();
        assert!(key.is_valid_for(&d));

        let mut narrowed = d.clone();
        narrowed.upsert(SignalDomain::new("mode", vec!["0".into()]).unwrap());
        assert!(!key.is_valid_for(&narrowed));

        let mut widened = d.clone();
        widened
            .insert(SignalDomain::new("bicep", vec!["true".into(), "false".into()]).unwrap())
            .unwrap();
        assert!(!key.is_valid_for(&widened));
    }

    #[test]
    fn key_serializes_as_string() {
        let key = CombinationKey::parse("notflexed|2", &domains()).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), r#""notflexed|2""#);
        let back: CombinationKey = serde_json::from_str(r#""notflexed|2""#).unwrap();
        assert_eq!(back, key);
    }
}
