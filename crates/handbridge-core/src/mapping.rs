//! Durable signal-domain and action-mapping tables.
//!
//! Two flat JSON documents under the project root:
//!
//! ```text
//! signals.json   { "finger1": ["flexed", "notflexed"], "mode": ["0", "1", "2"] }
//! mapping.json   { "flexed|0": null, "flexed|1": ["fist"], ... }
//! ```
//!
//! The store keeps a parsed copy of both tables behind an `RwLock`. Every
//! write clones the tables, applies the change, persists both files with
//! [`atomic_write`](crate::io::atomic_write) and only then swaps the new copy
//! in, so readers see either the old tables or the new ones. Concurrent
//! writers are serialized by the lock; the last one wins.

use crate::action::Action;
use crate::error::{BridgeError, Result};
use crate::io::{atomic_write, read_json_lenient};
use crate::key::{key_space, key_space_size, CombinationKey, KeyPattern};
use crate::paths;
use crate::signal::{SignalDomain, SignalDomains};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type ActionMapping = BTreeMap<CombinationKey, Vec<Action>>;

/// Largest key space a declaration change may produce. `mapping.json` lists
/// every key, so this bounds its size.
pub const MAX_KEY_SPACE: usize = 65_536;

fn check_key_space(domains: &SignalDomains) -> Result<()> {
    let size = key_space_size(domains);
    if size > MAX_KEY_SPACE {
        return Err(BridgeError::KeySpaceTooLarge {
            size,
            limit: MAX_KEY_SPACE,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct Tables {
    domains: SignalDomains,
    mapping: ActionMapping,
}

impl Tables {
    /// Drop every mapping entry that no longer names a key in the key space.
    fn prune(&mut self) -> usize {
        let before = self.mapping.len();
        let domains = &self.domains;
        self.mapping.retain(|k, _| k.is_valid_for(domains));
        before - self.mapping.len()
    }
}

pub struct MappingStore {
    root: PathBuf,
    tables: RwLock<Tables>,
}

impl MappingStore {
    /// Open the store rooted at `root`, loading whatever can be recovered
    /// from disk. Missing or malformed files yield empty tables.
    pub fn open(root: &Path) -> Self {
        let store = Self {
            root: root.to_path_buf(),
            tables: RwLock::new(Tables::default()),
        };
        store.reload();
        store
    }

    /// Re-read both files from disk, replacing the in-memory tables.
    pub fn reload(&self) {
        let tables = load_tables(&self.root);
        tracing::debug!(
            signals = tables.domains.len(),
            mapped = tables.mapping.len(),
            "mapping store loaded"
        );
        *self.write() = tables;
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn domains(&self) -> SignalDomains {
        self.read().domains.clone()
    }

    pub fn mapping(&self) -> ActionMapping {
        self.read().mapping.clone()
    }

    /// Actions mapped to `key`; an unmapped key is an empty sequence.
    pub fn lookup(&self, key: &CombinationKey) -> Vec<Action> {
        self.read().mapping.get(key).cloned().unwrap_or_default()
    }

    /// The whole key space in canonical order, `None` for unmapped keys.
    pub fn full_table(&self) -> Vec<(CombinationKey, Option<Vec<Action>>)> {
        let tables = self.read();
        key_space(&tables.domains)
            .into_iter()
            .map(|k| {
                let actions = tables.mapping.get(&k).cloned();
                (k, actions)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Domain writes
    // -----------------------------------------------------------------------

    /// Declare a new signal. Fails if the name is already declared.
    pub fn create_domain(&self, domain: SignalDomain) -> Result<()> {
        self.modify(|t| {
            t.domains.insert(domain)?;
            check_key_space(&t.domains)
        })
    }

    /// Declare a signal or replace the values of an existing one.
    pub fn put_domain(&self, domain: SignalDomain) -> Result<()> {
        self.modify(|t| {
            t.domains.upsert(domain);
            check_key_space(&t.domains)
        })
    }

    pub fn remove_domain(&self, name: &str) -> Result<SignalDomain> {
        self.modify(|t| t.domains.remove(name))
    }

    // -----------------------------------------------------------------------
    // Mapping writes
    // -----------------------------------------------------------------------

    /// Map every key matched by `pattern` to `actions`. Returns the number of
    /// keys written.
    pub fn put_mapping(&self, pattern: &str, actions: Vec<Action>) -> Result<usize> {
        self.modify(|t| {
            let keys = KeyPattern::parse(pattern, &t.domains)?.expand(&t.domains);
            if keys.is_empty() {
                return Err(BridgeError::NoMatchingKeys(pattern.to_string()));
            }
            let n = keys.len();
            for key in keys {
                t.mapping.insert(key, actions.clone());
            }
            Ok(n)
        })
    }

    /// Unmap every key matched by `pattern`. Returns the number removed.
    pub fn remove_mapping(&self, pattern: &str) -> Result<usize> {
        self.modify(|t| {
            let pattern = KeyPattern::parse(pattern, &t.domains)?;
            let before = t.mapping.len();
            t.mapping.retain(|k, _| !pattern.matches(k));
            Ok(before - t.mapping.len())
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn modify<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut guard = self.write();
        let mut next = guard.clone();
        let out = f(&mut next)?;
        let pruned = next.prune();
        if pruned > 0 {
            tracing::info!("dropped {pruned} mapping entries outside the key space");
        }
        save_tables(&self.root, &next)?;
        *guard = next;
        Ok(out)
    }
}

fn load_tables(root: &Path) -> Tables {
    let mut domains: SignalDomains =
        read_json_lenient(&paths::signals_path(root)).unwrap_or_default();
    domains.sanitize();

    let raw: BTreeMap<String, Option<Vec<String>>> =
        read_json_lenient(&paths::mapping_path(root)).unwrap_or_default();

    let mut mapping = ActionMapping::new();
    for (key, tokens) in raw {
        let Some(tokens) = tokens else { continue };
        let key = match CombinationKey::parse(&key, &domains) {
            Ok(k) => k,
            Err(e) => {
                tracing::warn!("dropping mapping for '{key}': {e}");
                continue;
            }
        };
        match Action::parse_all(&tokens) {
            Ok(actions) => {
                mapping.insert(key, actions);
            }
            Err(e) => tracing::warn!("dropping mapping for '{key}': {e}"),
        }
    }

    Tables { domains, mapping }
}

fn save_tables(root: &Path, tables: &Tables) -> Result<()> {
    let signals = serde_json::to_string_pretty(&tables.domains)?;
    atomic_write(&paths::signals_path(root), signals.as_bytes())?;

    // Write the whole key space so unmapped combinations are visible (as
    // null) to anyone editing the file by hand.
    let full: BTreeMap<String, Option<&Vec<Action>>> = key_space(&tables.domains)
        .into_iter()
        .map(|k| {
            let actions = tables.mapping.get(&k);
            (k.to_string(), actions)
        })
        .collect();
    let mapping = serde_json::to_string_pretty(&full)?;
    atomic_write(&paths::mapping_path(root), mapping.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn domain(name: &str, values: &[&str]) -> SignalDomain {
        SignalDomain::new(name, values.iter().map(|v| v.to_string()).collect()).unwrap()
    }

    fn seeded(dir: &TempDir) -> MappingStore {
        let store = MappingStore::open(dir.path());
        store
            .create_domain(domain("finger1", &["flexed", "notflexed"]))
            .unwrap();
        store.create_domain(domain("mode", &["0", "1", "2"])).unwrap();
        store
    }

    fn key(store: &MappingStore, s: &str) -> CombinationKey {
        CombinationKey::parse(s, &store.domains()).unwrap()
    }

    #[test]
    fn lookup_of_unmapped_key_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        assert!(store.lookup(&key(&store, "flexed|1")).is_empty());
    }

    #[test]
    fn put_mapping_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        let n = store
            .put_mapping("flexed|1", Action::parse_all(&["fist"]).unwrap())
            .unwrap();
        assert_eq!(n, 1);

        let reopened = MappingStore::open(dir.path());
        assert_eq!(reopened.domains().names(), vec!["finger1", "mode"]);
        assert_eq!(
            reopened.lookup(&key(&reopened, "flexed|1")),
            vec![Action::ExecuteGesture("fist".into())]
        );

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("mapping.json")).unwrap())
                .unwrap();
        assert_eq!(raw["flexed|1"], serde_json::json!(["fist"]));
        assert!(raw["notflexed|2"].is_null());
        assert_eq!(raw.as_object().unwrap().len(), 6);
    }

    #[test]
    fn wildcard_mapping_covers_matches() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        let n = store
            .put_mapping("*|2", Action::parse_all(&["next_servo"]).unwrap())
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.mapping().len(), 2);

        assert_eq!(store.remove_mapping("flexed|*").unwrap(), 1);
        assert_eq!(store.mapping().len(), 1);
    }

    #[test]
    fn bad_pattern_leaves_tables_untouched() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        assert!(store.put_mapping("flexed|7", vec![]).is_err());
        assert!(store.put_mapping("flexed", vec![]).is_err());
        assert!(store.mapping().is_empty());
    }

    #[test]
    fn create_domain_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        assert!(matches!(
            store.create_domain(domain("mode", &["0"])),
            Err(BridgeError::SignalExists(_))
        ));
    }

    #[test]
    fn removing_a_signal_drops_stale_keys() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        store
            .put_mapping("flexed|1", Action::parse_all(&["fist"]).unwrap())
            .unwrap();
        store.remove_domain("mode").unwrap();
        assert!(store.mapping().is_empty());
        assert_eq!(store.full_table().len(), 2);
        assert!(matches!(
            store.remove_domain("mode"),
            Err(BridgeError::SignalNotFound(_))
        ));
    }

    #[test]
    fn adding_a_signal_expands_key_space() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        store
            .put_mapping("flexed|1", Action::parse_all(&["fist"]).unwrap())
            .unwrap();
        store
            .create_domain(domain("bicep", &["true", "false"]))
            .unwrap();
        assert!(store.mapping().is_empty());
        assert_eq!(store.full_table().len(), 12);
    }

    #[test]
    fn narrowing_values_keeps_surviving_keys() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        store
            .put_mapping("*|*", Action::parse_all(&["fist"]).unwrap())
            .unwrap();
        store.put_domain(domain("mode", &["0", "1"])).unwrap();
        assert_eq!(store.mapping().len(), 4);
    }

    #[test]
    fn key_space_is_capped() {
        let dir = TempDir::new().unwrap();
        let store = MappingStore::open(dir.path());
        let wide: Vec<String> = (0..41).map(|i| i.to_string()).collect();
        let wide: Vec<&str> = wide.iter().map(String::as_str).collect();
        store.create_domain(domain("a", &wide)).unwrap();
        store.create_domain(domain("b", &wide)).unwrap();

        assert!(matches!(
            store.create_domain(domain("c", &wide)),
            Err(BridgeError::KeySpaceTooLarge { size: 68_921, .. })
        ));
        assert!(matches!(
            store.put_domain(domain("c", &wide)),
            Err(BridgeError::KeySpaceTooLarge { .. })
        ));
        assert_eq!(store.domains().names(), vec!["a", "b"]);

        let reopened = MappingStore::open(dir.path());
        assert_eq!(reopened.domains().len(), 2);
    }

    #[test]
    fn reserved_gesture_names_survive_reload() {
        let dir = TempDir::new().unwrap();
        let store = seeded(&dir);
        store
            .put_mapping(
                "flexed|1",
                Action::parse_all(&["gesture:next_servo", "gesture:delay"]).unwrap(),
            )
            .unwrap();
        store
            .put_mapping("flexed|2", Action::parse_all(&["gesture:open:wide"]).unwrap())
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("mapping.json")).unwrap())
                .unwrap();
        assert_eq!(
            raw["flexed|1"],
            serde_json::json!(["gesture:next_servo", "gesture:delay"])
        );

        let reopened = MappingStore::open(dir.path());
        assert_eq!(
            reopened.lookup(&key(&reopened, "flexed|1")),
            vec![
                Action::ExecuteGesture("next_servo".into()),
                Action::ExecuteGesture("delay".into()),
            ]
        );
        assert_eq!(
            reopened.lookup(&key(&reopened, "flexed|2")),
            vec![Action::ExecuteGesture("open:wide".into())]
        );
    }

    #[test]
    fn malformed_files_load_as_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("signals.json"), "not json").unwrap();
        std::fs::write(dir.path().join("mapping.json"), "[1, 2").unwrap();
        let store = MappingStore::open(dir.path());
        assert!(store.domains().is_empty());
        assert!(store.mapping().is_empty());
    }

    #[test]
    fn bad_entries_are_dropped_individually() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("signals.json"),
            r#"{"finger1": ["flexed", "notflexed"]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("mapping.json"),
            r#"{"flexed": ["delay:nope"], "notflexed": ["fist"], "stale|key": ["fist"]}"#,
        )
        .unwrap();
        let store = MappingStore::open(dir.path());
        let mapping = store.mapping();
        assert_eq!(mapping.len(), 1);
        assert_eq!(
            store.lookup(&key(&store, "notflexed")),
            vec![Action::ExecuteGesture("fist".into())]
        );
    }
}
