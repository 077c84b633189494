use crate::output::{print_json, print_table, tokens};
use anyhow::Context;
use clap::Subcommand;
use handbridge_core::action::Action;
use handbridge_core::mapping::MappingStore;
use std::path::Path;

#[derive(Subcommand)]
pub enum MapSubcommand {
    /// Map a key, or every key matching a `*` pattern, to actions
    ///
    /// Actions: delay:<ms>, select_servo:<i>, next_servo, prev_servo,
    /// increase_angle:<d>, decrease_angle:<d>, gesture:<name> or a bare
    /// gesture name.
    Set {
        /// Values joined by '|' in signal order, e.g. flexed|1 or *|2
        pattern: String,
        #[arg(required = true, allow_hyphen_values = true)]
        actions: Vec<String>,
    },
    /// Unmap every key matching a pattern
    Clear { pattern: String },
    /// Show the mapping table
    Show {
        /// Include unmapped keys
        #[arg(long)]
        all: bool,
    },
}

pub fn run(root: &Path, subcmd: MapSubcommand, json: bool) -> anyhow::Result<()> {
    let store = MappingStore::open(root);
    match subcmd {
        MapSubcommand::Set { pattern, actions } => set(&store, &pattern, &actions, json),
        MapSubcommand::Clear { pattern } => clear(&store, &pattern, json),
        MapSubcommand::Show { all } => show(&store, all, json),
    }
}

fn set(store: &MappingStore, pattern: &str, tokens_in: &[String], json: bool) -> anyhow::Result<()> {
    let actions = Action::parse_all(tokens_in)?;
    let n = store
        .put_mapping(pattern, actions.clone())
        .with_context(|| format!("failed to map '{pattern}'"))?;
    if json {
        print_json(&serde_json::json!({ "pattern": pattern, "updated": n, "actions": actions }))?;
    } else {
        println!("Mapped {n} key(s) to: {}", tokens(&actions));
    }
    Ok(())
}

fn clear(store: &MappingStore, pattern: &str, json: bool) -> anyhow::Result<()> {
    let n = store.remove_mapping(pattern)?;
    if json {
        print_json(&serde_json::json!({ "pattern": pattern, "removed": n }))?;
    } else {
        println!("Unmapped {n} key(s).");
    }
    Ok(())
}

fn show(store: &MappingStore, all: bool, json: bool) -> anyhow::Result<()> {
    let table: Vec<_> = if all {
        store.full_table()
    } else {
        store
            .mapping()
            .into_iter()
            .map(|(k, a)| (k, Some(a)))
            .collect()
    };

    if json {
        let entries: Vec<serde_json::Value> = table
            .iter()
            .map(|(key, actions)| serde_json::json!({ "key": key, "actions": actions }))
            .collect();
        return print_json(&serde_json::json!({
            "signals": store.domains().names(),
            "entries": entries,
        }));
    }

    if table.is_empty() {
        println!("No mappings.");
        return Ok(());
    }
    let header = store.domains().names().join("|");
    let rows = table
        .into_iter()
        .map(|(key, actions)| {
            let actions = actions.map_or_else(|| "-".to_string(), |a| tokens(&a));
            vec![key.to_string(), actions]
        })
        .collect();
    print_table(&[header.as_str(), "ACTIONS"], rows);
    Ok(())
}
