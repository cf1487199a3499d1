use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

use taskpanel_core::{store, PlanStatus, RecordId};

fn taskpanel_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("taskpanel"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("RUST_LOG");
    cmd
}

/// `demo` record with one plan, rendered.
fn init_demo(home: &TempDir) -> PathBuf {
    taskpanel_cmd(home.path())
        .args(["init", "demo", "--title", "Demo"])
        .assert()
        .success()
        .stdout(contains("Created record 'demo'"));
    taskpanel_cmd(home.path())
        .args(["plan", "add", "demo", "write parser"])
        .assert()
        .success()
        .stdout(contains("Added plan P1"));
    store::panel_path_at(home.path(), &RecordId::from("demo"))
}

fn edit_panel(path: &Path, from: &str, to: &str) {
    let text = fs::read_to_string(path).expect("read panel");
    assert!(text.contains(from), "panel lacks {from:?}:\n{text}");
    fs::write(path, text.replace(from, to)).expect("write panel");
}

fn json_stdout(home: &Path, args: &[&str]) -> Value {
    let output = taskpanel_cmd(home).args(args).output().expect("run taskpanel");
    assert!(
        output.status.success(),
        "taskpanel {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json stdout")
}

#[test]
fn init_renders_panel_and_is_idempotent() {
    let home = TempDir::new().expect("home");
    let panel = init_demo(&home);

    let text = fs::read_to_string(&panel).expect("read panel");
    assert!(text.starts_with("<!-- taskpanel record=demo "));
    assert!(text.contains("# Demo"));
    assert!(text.contains("- [ ] write parser <!-- id:P1 -->"));

    taskpanel_cmd(home.path())
        .args(["init", "demo", "--title", "Ignored"])
        .assert()
        .success()
        .stdout(contains("already exists (Demo)"))
        .stdout(contains("unchanged"));
}

#[test]
fn preview_reports_title_edit_without_writing() {
    let home = TempDir::new().expect("home");
    let panel = init_demo(&home);
    edit_panel(&panel, "# Demo", "# Demo, renamed");

    let preview = json_stdout(home.path(), &["preview", "demo", "--json"]);
    assert_eq!(preview["applied"], false);
    assert_eq!(preview["changes"][0]["kind"], "content");
    assert_eq!(preview["changes"][0]["section"], "title");
    assert_eq!(preview["changes"][0]["new_value"], "Demo, renamed");

    let record = store::load_record_at(home.path(), &RecordId::from("demo")).expect("load");
    assert_eq!(record.title, "Demo");
}

#[test]
fn apply_folds_edits_into_record() {
    let home = TempDir::new().expect("home");
    let panel = init_demo(&home);
    edit_panel(&panel, "write parser", "write the parser");

    let applied = json_stdout(home.path(), &["apply", "demo", "--json"]);
    assert_eq!(applied["applied"], true);
    assert_eq!(applied["written"], true);
    assert_eq!(applied["changes"][0]["section"], "plan:P1");

    let record = store::load_record_at(home.path(), &RecordId::from("demo")).expect("load");
    assert_eq!(record.plans[0].description, "write the parser");

    taskpanel_cmd(home.path())
        .args(["preview", "demo"])
        .assert()
        .success()
        .stdout(contains("No pending panel edits."));
}

#[test]
fn marker_edit_stays_pending_until_set_status() {
    let home = TempDir::new().expect("home");
    let panel = init_demo(&home);
    edit_panel(&panel, "- [ ] write parser", "- [x] write parser");

    taskpanel_cmd(home.path())
        .args(["apply", "demo"])
        .assert()
        .success()
        .stdout(contains("P1: to_do → completed (pending"));
    let record = store::load_record_at(home.path(), &RecordId::from("demo")).expect("load");
    assert_eq!(record.plans[0].status, PlanStatus::ToDo);
    assert!(fs::read_to_string(&panel).expect("read").contains("- [x] write parser"));

    taskpanel_cmd(home.path())
        .args(["set-status", "demo", "P1", "completed"])
        .assert()
        .success()
        .stdout(contains("P1: to_do → completed"));
    let record = store::load_record_at(home.path(), &RecordId::from("demo")).expect("load");
    assert_eq!(record.plans[0].status, PlanStatus::Completed);

    let preview = json_stdout(home.path(), &["preview", "demo", "--json"]);
    assert_eq!(preview["changes"], Value::Array(vec![]));
}

#[test]
fn structured_edits_land_in_record_and_panel() {
    let home = TempDir::new().expect("home");
    let panel = init_demo(&home);

    taskpanel_cmd(home.path())
        .args(["step", "add", "demo", "P1", "tokenize"])
        .assert()
        .success()
        .stdout(contains("Added step P1.S1"));
    taskpanel_cmd(home.path())
        .args([
            "evr", "add", "demo", "parser accepts fixtures", "--class", "runtime", "--verify",
            "cargo test", "--expect", "all green",
        ])
        .assert()
        .success()
        .stdout(contains("Added expected result E1"));
    taskpanel_cmd(home.path())
        .args(["evr-status", "demo", "E1", "passing", "--proof", "ci run 42"])
        .assert()
        .success();
    taskpanel_cmd(home.path())
        .args(["log", "demo", "kicked off parser work"])
        .assert()
        .success()
        .stdout(contains("Logged"));

    let record = store::load_record_at(home.path(), &RecordId::from("demo")).expect("load");
    assert_eq!(record.plans[0].steps[0].description, "tokenize");
    assert_eq!(record.evrs[0].verify, vec!["cargo test".to_string()]);
    assert_eq!(record.evrs[0].proof.as_deref(), Some("ci run 42"));
    assert_eq!(record.logs.len(), 1);

    let text = fs::read_to_string(&panel).expect("read panel");
    assert!(text.contains("  - [ ] tokenize <!-- id:P1.S1 -->"));
    assert!(text.contains("parser accepts fixtures"));
    assert!(text.contains("kicked off parser work"));
}

#[test]
fn status_and_diff_track_panel_edits() {
    let home = TempDir::new().expect("home");
    let panel = init_demo(&home);

    let status = json_stdout(home.path(), &["status", "--json"]);
    assert_eq!(status[0]["record"], "demo");
    assert_eq!(status[0]["signal"], "current");
    taskpanel_cmd(home.path())
        .args(["diff", "demo"])
        .assert()
        .success()
        .stdout(contains("No differences for 'demo'."));

    edit_panel(&panel, "write parser", "write parser quickly");
    let status = json_stdout(home.path(), &["status", "demo", "--json"]);
    assert_eq!(status[0]["signal"], "edited");
    assert_eq!(status[0]["pending_changes"], 1);
    taskpanel_cmd(home.path())
        .args(["diff", "demo"])
        .assert()
        .success()
        .stdout(contains("--- a/demo.md"))
        .stdout(contains("-- [ ] write parser quickly <!-- id:P1 -->"));

    taskpanel_cmd(home.path())
        .args(["status"])
        .assert()
        .success()
        .stdout(contains("EDITED"));
}

#[test]
fn unknown_record_fails_cleanly() {
    let home = TempDir::new().expect("home");
    taskpanel_cmd(home.path())
        .args(["preview", "ghost"])
        .assert()
        .failure()
        .stderr(contains("ghost"));
}
