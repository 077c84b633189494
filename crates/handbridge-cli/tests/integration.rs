#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn handbridge(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("handbridge").unwrap();
    cmd.current_dir(dir.path())
        .env("HANDBRIDGE_ROOT", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

fn init_project(dir: &TempDir) {
    handbridge(dir).arg("init").assert().success();
}

/// `finger1 ∈ {flexed, notflexed}`, `mode ∈ {0, 1, 2}`.
fn init_with_signals(dir: &TempDir) {
    init_project(dir);
    handbridge(dir)
        .args(["signal", "add", "finger1", "flexed", "notflexed"])
        .assert()
        .success();
    handbridge(dir)
        .args(["signal", "add", "mode", "0", "1", "2"])
        .assert()
        .success();
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

// ---------------------------------------------------------------------------
// handbridge init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_project_files() {
    let dir = TempDir::new().unwrap();
    handbridge(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: handbridge.yaml"));

    assert!(dir.path().join("handbridge.yaml").exists());
    assert!(dir.path().join("signals.json").exists());
    assert!(dir.path().join("mapping.json").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(dir.path().join("handbridge.yaml"), "server:\n  port: 7100\n").unwrap();

    handbridge(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  handbridge.yaml"));
    let yaml = std::fs::read_to_string(dir.path().join("handbridge.yaml")).unwrap();
    assert!(yaml.contains("7100"));
}

// ---------------------------------------------------------------------------
// handbridge signal
// ---------------------------------------------------------------------------

#[test]
fn signal_add_and_list() {
    let dir = TempDir::new().unwrap();
    init_with_signals(&dir);

    let list = stdout_json(handbridge(&dir).args(["signal", "list", "--json"]));
    assert_eq!(list[0]["name"], "finger1");
    assert_eq!(list[1]["values"], serde_json::json!(["0", "1", "2"]));

    handbridge(&dir)
        .args(["signal", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("flexed, notflexed"));
}

#[test]
fn signal_add_rejects_duplicates_and_bad_names() {
    let dir = TempDir::new().unwrap();
    init_with_signals(&dir);

    handbridge(&dir)
        .args(["signal", "add", "mode", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    handbridge(&dir)
        .args(["signal", "add", "wrist", "up", "up"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate value"));

    handbridge(&dir)
        .args(["signal", "add", "a|b", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid name"));
}

#[test]
fn signal_remove_prunes_mapping() {
    let dir = TempDir::new().unwrap();
    init_with_signals(&dir);
    handbridge(&dir)
        .args(["map", "set", "flexed|1", "fist"])
        .assert()
        .success();

    let out = stdout_json(handbridge(&dir).args(["signal", "remove", "mode", "--json"]));
    assert_eq!(out["keys"], 2);
    assert_eq!(out["mapped"], 0);

    handbridge(&dir)
        .args(["signal", "remove", "mode"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("signal not found"));
}

// ---------------------------------------------------------------------------
// handbridge map
// ---------------------------------------------------------------------------

#[test]
fn map_set_and_show() {
    let dir = TempDir::new().unwrap();
    init_with_signals(&dir);

    handbridge(&dir)
        .args(["map", "set", "*|2", "select_servo:3", "increase_angle:10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mapped 2 key(s)"));

    let shown = stdout_json(handbridge(&dir).args(["map", "show", "--json"]));
    let entries = shown["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["key"], "notflexed|2");

    let all = stdout_json(handbridge(&dir).args(["map", "show", "--all", "--json"]));
    assert_eq!(all["entries"].as_array().unwrap().len(), 6);

    handbridge(&dir)
        .args(["map", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("finger1|mode"))
        .stdout(predicate::str::contains("select_servo:3 increase_angle:10"));

    let on_disk: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("mapping.json")).unwrap(),
    )
    .unwrap();
    assert!(on_disk["flexed|0"].is_null());
    assert_eq!(on_disk["flexed|2"][0], "select_servo:3");
}

#[test]
fn map_set_rejects_bad_tokens_and_keys() {
    let dir = TempDir::new().unwrap();
    init_with_signals(&dir);

    handbridge(&dir)
        .args(["map", "set", "flexed|1", "delay:later"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid action"));

    handbridge(&dir)
        .args(["map", "set", "flexed|9", "fist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("flexed|9"));
}

#[test]
fn map_clear_by_pattern() {
    let dir = TempDir::new().unwrap();
    init_with_signals(&dir);
    handbridge(&dir)
        .args(["map", "set", "*|*", "fist"])
        .assert()
        .success();

    let out = stdout_json(handbridge(&dir).args(["map", "clear", "flexed|*", "--json"]));
    assert_eq!(out["removed"], 3);
}

// ---------------------------------------------------------------------------
// handbridge config
// ---------------------------------------------------------------------------

#[test]
fn config_show_fills_defaults() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(dir.path().join("handbridge.yaml"), "aggregator:\n  debounce_ms: 500\n").unwrap();

    let cfg = stdout_json(handbridge(&dir).args(["config", "show", "--json"]));
    assert_eq!(cfg["aggregator"]["debounce_ms"], 500);
    assert_eq!(cfg["server"]["port"], 7000);
}

#[test]
fn config_validate_clean_project() {
    let dir = TempDir::new().unwrap();
    init_with_signals(&dir);
    handbridge(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No warnings"));
}

#[test]
fn config_validate_flags_trigger_on_undeclared_signal() {
    let dir = TempDir::new().unwrap();
    init_with_signals(&dir);
    std::fs::write(
        dir.path().join("handbridge.yaml"),
        "triggers:\n  cheek:\n    signal: cheek\n",
    )
    .unwrap();

    handbridge(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("undeclared signal 'cheek'"));
}

#[test]
fn commands_without_init_fail() {
    let dir = TempDir::new().unwrap();
    handbridge(&dir)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

// ---------------------------------------------------------------------------
// handbridge send
// ---------------------------------------------------------------------------

#[test]
fn send_posts_gesture() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/execute")
        .match_body(mockito::Matcher::Json(serde_json::json!({
            "gesture": "handshake",
            "thumb_clearance": true
        })))
        .with_status(200)
        .create();

    let dir = TempDir::new().unwrap();
    handbridge(&dir)
        .args(["send", "--gesture", "handshake", "--thumb-clearance", "--server"])
        .arg(server.url())
        .assert()
        .success()
        .stdout(predicate::str::contains("Sent 'handshake'"));
    mock.assert();
}

#[test]
fn send_list_prints_gestures() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/gestures")
        .with_status(200)
        .with_body(r#"{"gestures": ["fist", "grip1open"]}"#)
        .create();

    let dir = TempDir::new().unwrap();
    handbridge(&dir)
        .args(["send", "--list", "--server"])
        .arg(server.url())
        .assert()
        .success()
        .stdout(predicate::str::contains("grip1open"));
}

#[test]
fn send_reports_rejection() {
    let mut server = mockito::Server::new();
    server.mock("POST", "/execute").with_status(422).create();

    let dir = TempDir::new().unwrap();
    handbridge(&dir)
        .args(["send", "--gesture", "nope", "--server"])
        .arg(server.url())
        .assert()
        .failure()
        .stderr(predicate::str::contains("status 422"));
}

#[test]
fn send_requires_gesture_or_list() {
    let dir = TempDir::new().unwrap();
    handbridge(&dir).arg("send").assert().failure();
}
