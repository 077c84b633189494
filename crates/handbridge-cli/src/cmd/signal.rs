use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use handbridge_core::mapping::MappingStore;
use handbridge_core::signal::SignalDomain;
use std::path::Path;

#[derive(Subcommand)]
pub enum SignalSubcommand {
    /// Declare a new signal at the end of the signal order
    Add {
        name: String,
        /// Permitted values, in order
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Declare a signal or replace its values
    Set {
        name: String,
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Remove a signal and every mapping entry that used it
    Remove { name: String },
    /// List signals in canonical order
    List,
}

pub fn run(root: &Path, subcmd: SignalSubcommand, json: bool) -> anyhow::Result<()> {
    let store = MappingStore::open(root);
    match subcmd {
        SignalSubcommand::Add { name, values } => {
            let domain = SignalDomain::new(name, values)?;
            store
                .create_domain(domain.clone())
                .with_context(|| format!("failed to add signal '{}'", domain.name))?;
            report(&store, "added", &domain, json)
        }
        SignalSubcommand::Set { name, values } => {
            let domain = SignalDomain::new(name, values)?;
            store
                .put_domain(domain.clone())
                .with_context(|| format!("failed to set signal '{}'", domain.name))?;
            report(&store, "set", &domain, json)
        }
        SignalSubcommand::Remove { name } => {
            let domain = store.remove_domain(&name)?;
            report(&store, "removed", &domain, json)
        }
        SignalSubcommand::List => list(&store, json),
    }
}

fn report(store: &MappingStore, verb: &str, domain: &SignalDomain, json: bool) -> anyhow::Result<()> {
    let keys = store.full_table().len();
    let mapped = store.mapping().len();
    if json {
        print_json(&serde_json::json!({
            "name": domain.name,
            "values": domain.values,
            "keys": keys,
            "mapped": mapped,
        }))?;
    } else {
        println!("Signal '{}' {verb}.", domain.name);
        println!("Key space: {keys} combinations, {mapped} mapped.");
    }
    Ok(())
}

fn list(store: &MappingStore, json: bool) -> anyhow::Result<()> {
    let domains = store.domains();
    if json {
        let list: Vec<&SignalDomain> = domains.iter().collect();
        return print_json(&list);
    }
    if domains.is_empty() {
        println!("No signals declared.");
        return Ok(());
    }
    let rows = domains
        .iter()
        .enumerate()
        .map(|(i, d)| vec![(i + 1).to_string(), d.name.clone(), d.values.join(", ")])
        .collect();
    print_table(&["#", "SIGNAL", "VALUES"], rows);
    Ok(())
}
