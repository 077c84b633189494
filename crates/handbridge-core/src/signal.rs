//! Signal domains: the declared input channels and their permitted values.
//!
//! Declaration order is significant. It is the canonical signal order used
//! to build combination keys, and it survives a round-trip through
//! `signals.json` because the table is (de)serialized as an ordered map.

use crate::error::{BridgeError, Result};
use crate::paths::validate_name;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// SignalDomain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDomain {
    pub name: String,
    pub values: Vec<String>,
}

impl SignalDomain {
    /// Build a validated domain: legal name, at least one value, every value
    /// legal and unique.
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        validate_name(&name)?;
        let values: Vec<String> = values.into_iter().map(|v| v.trim().to_string()).collect();
        if values.is_empty() {
            return Err(BridgeError::EmptyDomain(name));
        }
        for (i, v) in values.iter().enumerate() {
            validate_name(v).map_err(|_| BridgeError::InvalidValue {
                signal: name.clone(),
                value: v.clone(),
            })?;
            if values[..i].contains(v) {
                return Err(BridgeError::DuplicateValue {
                    signal: name.clone(),
                    value: v.clone(),
                });
            }
        }
        Ok(Self { name, values })
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

// ---------------------------------------------------------------------------
// SignalDomains
// ---------------------------------------------------------------------------

/// The ordered set of declared signals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalDomains {
    domains: Vec<SignalDomain>,
}

impl SignalDomains {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalDomain> {
        self.domains.iter()
    }

    /// Signal names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.domains.iter().map(|d| d.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&SignalDomain> {
        self.domains.iter().find(|d| d.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.domains.iter().position(|d| d.name == name)
    }

    /// Check that `name` is declared and `value` is one of its values.
    pub fn check(&self, name: &str, value: &str) -> Result<()> {
        let domain = self
            .get(name)
            .ok_or_else(|| BridgeError::SignalNotFound(name.to_string()))?;
        if !domain.contains(value) {
            return Err(BridgeError::InvalidValue {
                signal: name.to_string(),
                value: value.to_string(),
            });
        }
        Ok(())
    }

    /// Add a new signal at the end of the declaration order.
    pub fn insert(&mut self, domain: SignalDomain) -> Result<()> {
        if self.get(&domain.name).is_some() {
            return Err(BridgeError::SignalExists(domain.name));
        }
        self.domains.push(domain);
        Ok(())
    }

    /// Replace the values of an existing signal in place, or append it.
    pub fn upsert(&mut self, domain: SignalDomain) {
        match self.position(&domain.name) {
            Some(i) => self.domains[i] = domain,
            None => self.domains.push(domain),
        }
    }

    pub fn remove(&mut self, name: &str) -> Result<SignalDomain> {
        let i = self
            .position(name)
            .ok_or_else(|| BridgeError::SignalNotFound(name.to_string()))?;
        Ok(self.domains.remove(i))
    }

    /// Drop entries that fail validation, returning how many were dropped.
    pub(crate) fn sanitize(&mut self) -> usize {
        let before = self.domains.len();
        self.domains.retain(|d| match SignalDomain::new(&d.name, d.values.clone()) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("dropping signal '{}': {e}", d.name);
                false
            }
        });
        before - self.domains.len()
    }
}

impl FromIterator<SignalDomain> for SignalDomains {
    fn from_iter<I: IntoIterator<Item = SignalDomain>>(iter: I) -> Self {
        let mut out = SignalDomains::new();
        for d in iter {
            out.upsert(d);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Serde: `{ "finger1": ["flexed", "notflexed"], "mode": ["0", "1", "2"] }`
// ---------------------------------------------------------------------------

impl Serialize for SignalDomains {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.domains.len()))?;
        for d in &self.domains {
            map.serialize_entry(&d.name, &d.values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SignalDomains {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        struct DomainsVisitor;

        impl<'de> Visitor<'de> for DomainsVisitor {
            type Value = SignalDomains;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of signal name to value list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut out = SignalDomains::new();
                while let Some((name, values)) = access.next_entry::<String, Vec<String>>()? {
                    out.upsert(SignalDomain { name, values });
                }
                Ok(out)
            }
        }

        d.deserialize_map(DomainsVisitor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(name: &str, values: &[&str]) -> SignalDomain {
        SignalDomain::new(name, values.iter().map(|v| v.to_string()).collect()).unwrap()
    }

    #[test]
    fn domain_rejects_empty_and_duplicates() {
        assert!(matches!(
            SignalDomain::new("mode", vec![]),
            Err(BridgeError::EmptyDomain(_))
        ));
        assert!(matches!(
            SignalDomain::new("mode", vec!["1".into(), "1".into()]),
            Err(BridgeError::DuplicateValue { .. })
        ));
        assert!(matches!(
            SignalDomain::new("mode", vec!["a|b".into()]),
            Err(BridgeError::InvalidValue { .. })
        ));
        assert!(matches!(
            SignalDomain::new("  ", vec!["1".into()]),
            Err(BridgeError::InvalidName(_))
        ));
    }

    #[test]
    fn check_reports_unknown_signal_and_value() {
        let domains: SignalDomains = [domain("finger1", &["flexed", "notflexed"])]
            .into_iter()
            .collect();
        domains.check("finger1", "flexed").unwrap();
        assert!(matches!(
            domains.check("finger9", "flexed"),
            Err(BridgeError::SignalNotFound(_))
        ));
        assert!(matches!(
            domains.check("finger1", "wiggle"),
            Err(BridgeError::InvalidValue { .. })
        ));
    }

    #[test]
    fn insert_refuses_duplicates_upsert_replaces_in_place() {
        let mut domains = SignalDomains::new();
        domains.insert(domain("a", &["1"])).unwrap();
        domains.insert(domain("b", &["1"])).unwrap();
        assert!(domains.insert(domain("a", &["2"])).is_err());

        domains.upsert(domain("a", &["2", "3"]));
        assert_eq!(domains.names(), vec!["a", "b"]);
        assert_eq!(domains.get("a").unwrap().values, vec!["2", "3"]);
    }

    #[test]
    fn json_preserves_declaration_order() {
        let json = r#"{"zeta": ["1"], "alpha": ["x", "y"], "mid": ["q"]}"#;
        let domains: SignalDomains = serde_json::from_str(json).unwrap();
        assert_eq!(domains.names(), vec!["zeta", "alpha", "mid"]);

        let back = serde_json::to_string(&domains).unwrap();
        assert_eq!(back, r#"{"zeta":["1"],"alpha":["x","y"],"mid":["q"]}"#);
    }

    #[test]
    fn sanitize_drops_invalid_entries() {
        let json = r#"{"ok": ["1"], "bad name": ["1"], "empty": []}"#;
        let mut domains: SignalDomains = serde_json::from_str(json).unwrap();
        assert_eq!(domains.sanitize(), 2);
        assert_eq!(domains.names(), vec!["ok"]);
    }
}
