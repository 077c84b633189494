use crate::output::print_json;
use anyhow::Context;
use handbridge_core::config::Config;
use handbridge_core::error::BridgeError;
use handbridge_core::remote::{GestureService, HttpGestureService};
use std::path::Path;

pub struct SendOptions {
    pub gesture: Option<String>,
    pub thumb_clearance: bool,
    pub server: Option<String>,
    pub list: bool,
}

/// Talk to the gesture service directly, bypassing signals and mappings.
/// Works without `handbridge init`; the config only supplies defaults.
pub fn run(root: &Path, opts: SendOptions, json: bool) -> anyhow::Result<()> {
    let config = match Config::load(root) {
        Ok(c) => c,
        Err(BridgeError::NotInitialized) => Config::new(),
        Err(e) => return Err(e).context("failed to load config"),
    };
    let base_url = opts.server.unwrap_or(config.gesture.base_url.clone());
    let client = HttpGestureService::new(base_url, config.gesture.timeout())?;

    if opts.list {
        let gestures = client
            .gestures()
            .with_context(|| format!("failed to list gestures from {}", client.base_url()))?;
        if json {
            return print_json(&gestures);
        }
        match gestures.get("gestures").and_then(|g| g.as_array()) {
            Some(list) => {
                for g in list {
                    println!("{}", g.as_str().map(str::to_string).unwrap_or_else(|| g.to_string()));
                }
            }
            None => println!("{}", serde_json::to_string_pretty(&gestures)?),
        }
        return Ok(());
    }

    let gesture = opts
        .gesture
        .context("--gesture is required unless --list is given")?;
    let thumb_clearance = opts.thumb_clearance || config.gesture.thumb_clearance;
    client
        .execute(&gesture, thumb_clearance)
        .with_context(|| format!("failed to send '{gesture}' to {}", client.base_url()))?;

    if json {
        print_json(&serde_json::json!({
            "gesture": gesture,
            "thumb_clearance": thumb_clearance,
            "sent": true,
        }))?;
    } else {
        println!("Sent '{gesture}' to {}.", client.base_url());
    }
    Ok(())
}
