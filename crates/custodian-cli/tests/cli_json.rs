use assert_cmd::Command;
use custodian_testkit::{MockResponse, MockServer};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn custodian(workspace: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("custodian"));
    cmd.current_dir(workspace).env("HOME", workspace);
    cmd
}

fn run_json(workspace: &Path, args: &[&str]) -> Value {
    let output = custodian(workspace)
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("json output")
}

fn run_text(workspace: &Path, args: &[&str]) -> String {
    let output = custodian(workspace)
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(output).expect("utf8 output")
}

#[test]
fn config_layers_project_settings_and_flags() {
    let workspace = TempDir::new().expect("workspace");
    let runtime = workspace.path().join(".custodian");
    fs::create_dir_all(&runtime).expect("runtime dir");
    fs::write(
        runtime.join("settings.json"),
        r#"{"terminal":{"offline_threshold":5,"flash":{"pulses":2}}}"#,
    )
    .expect("project settings");

    let out = run_json(
        workspace.path(),
        &["--json", "--server", "http://10.0.0.9:9000", "--reduced-motion", "config"],
    );
    assert_eq!(out["link"]["base_url"], "http://10.0.0.9:9000");
    assert_eq!(out["link"]["boot_first_data_ms"], 800);
    assert_eq!(out["link"]["boot_idle_ms"], 5000);
    assert_eq!(out["terminal"]["offline_threshold"], 5);
    assert_eq!(out["terminal"]["flash"]["pulses"], 2);
    assert_eq!(out["terminal"]["flash"]["on_ms"], 120);
    assert_eq!(out["terminal"]["reduced_motion"], true);
}

#[test]
fn local_settings_win_over_project_settings() {
    let workspace = TempDir::new().expect("workspace");
    let runtime = workspace.path().join(".custodian");
    fs::create_dir_all(&runtime).expect("runtime dir");
    fs::write(
        runtime.join("settings.json"),
        r#"{"link":{"base_url":"http://project:1"}}"#,
    )
    .expect("project settings");
    fs::write(
        runtime.join("settings.local.json"),
        r#"{"link":{"base_url":"http://local:2"}}"#,
    )
    .expect("local settings");

    let out = run_json(workspace.path(), &["config", "--json"]);
    assert_eq!(out["link"]["base_url"], "http://local:2");
}

#[test]
fn completions_name_the_binary() {
    let workspace = TempDir::new().expect("workspace");
    let script = run_text(workspace.path(), &["completions", "--shell", "bash"]);
    assert!(script.contains("custodian"));
}

#[test]
fn send_reports_reply_as_json() {
    let workspace = TempDir::new().expect("workspace");
    let server = MockServer::start(vec![(
        "/command",
        vec![MockResponse::json(
            r#"{"ok":true,"lines":["ALL SYSTEMS NOMINAL"]}"#,
        )],
    )])
    .expect("mock server");

    let out = run_json(
        workspace.path(),
        &["--json", "--server", server.base_url(), "send", "status"],
    );
    assert_eq!(out["ok"], true);
    assert_eq!(out["raw"], "status");
    assert_eq!(out["lines"][0], "ALL SYSTEMS NOMINAL");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_str(&requests[0].body).expect("request json");
    assert_eq!(body["raw"], "status");
    assert_eq!(body["command_id"], out["command_id"]);
}

#[test]
fn send_echoes_directive_in_text_mode() {
    let workspace = TempDir::new().expect("workspace");
    let server = MockServer::start(vec![(
        "/command",
        vec![MockResponse::json(r#"{"ok":true,"lines":["DRONES DEPLOYED."]}"#)],
    )])
    .expect("mock server");

    let out = run_text(
        workspace.path(),
        &["--server", server.base_url(), "send", "deploy", "st"],
    );
    assert_eq!(out, "> DEPLOY ST\nDRONES DEPLOYED.\n");
}

#[test]
fn send_failure_prints_link_failed_and_exits_nonzero() {
    let workspace = TempDir::new().expect("workspace");
    let server = MockServer::start(Vec::new()).expect("mock server");

    let output = custodian(workspace.path())
        .args(["--server", server.base_url(), "send", "wait"])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8 output");
    assert!(text.contains("COMMAND LINK FAILED."));
    assert!(text.contains("VERIFY SERVER AND RETRY."));
}

#[test]
fn snapshot_masks_sectors_when_comms_are_compromised() {
    let workspace = TempDir::new().expect("workspace");
    let server = MockServer::start(vec![(
        "/snapshot",
        vec![MockResponse::json(
            r#"{"time":12,"threat":"HIGH","assault":"ACTIVE","sectors":[
                {"id":"CM","name":"COMMS","status":"COMPROMISED"},
                {"id":"CC","name":"COMMAND","status":"STABLE"},
                {"id":"PW","name":"POWER","status":"DAMAGED"}],
               "archive_losses":1,"archive_limit":3,"hardened":true}"#,
        )],
    )])
    .expect("mock server");

    let text = run_text(workspace.path(), &["--server", server.base_url(), "snapshot"]);
    assert!(text.contains("TIME...... 12"));
    assert!(text.contains("ASSAULT... ACTIVE?"));
    assert!(text.contains("POSTURE... HARDENED"));
    assert!(text.contains("ARCHIVE... 1 / 3"));
    assert!(text.contains("PW  POWER        [NO SIGNAL]"));
    assert!(text.contains("CC  COMMAND      STABLE"));

    let json = run_json(
        workspace.path(),
        &["--json", "--server", server.base_url(), "snapshot"],
    );
    assert_eq!(json["time"], 12);
    assert_eq!(json["sectors"][2]["status"], "DAMAGED");
}
