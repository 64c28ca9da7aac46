//! End-to-end conformance tests over the order-approval fixture bundle.
//!
//! Exercises the full matrix: rule evaluation for each fact variant,
//! every blocked-action reason, and flow simulation down both branches.

use assert_cmd::Command;
use serde_json::Value;
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("statute-cli should have parent")
        .parent()
        .expect("crates should have parent")
        .join("tests")
        .join("fixtures")
        .join("order_approval")
}

fn fixture(name: &str) -> String {
    fixtures_dir().join(name).to_string_lossy().into_owned()
}

fn statute(args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("statute").expect("binary builds");
    cmd.args(["--bundle", &fixture("bundle.json")]);
    cmd.args(args);
    cmd
}

fn run_json(args: &[&str]) -> Value {
    let output = statute(args).assert().success();
    serde_json::from_slice(&output.get_output().stdout).expect("stdout is JSON")
}

#[test]
fn validate_reports_construct_counts() {
    let report = run_json(&["validate"]);
    assert_eq!(report["id"], "order_approval");
    assert_eq!(report["facts"], 1);
    assert_eq!(report["entities"], 1);
    assert_eq!(report["rules"], 1);
    assert_eq!(report["operations"], 1);
    assert_eq!(report["flows"], 1);
}

#[test]
fn evaluate_active_produces_one_verdict() {
    let report = run_json(&["evaluate", "--facts", &fixture("facts_active.json")]);
    let verdicts = report["verdicts"].as_array().expect("verdicts array");
    assert_eq!(verdicts.len(), 1);
    assert_eq!(verdicts[0]["type"], "account_active");
    assert_eq!(verdicts[0]["provenance"]["rule"], "check_active");
    assert_eq!(verdicts[0]["provenance"]["stratum"], 0);
    assert_eq!(
        verdicts[0]["provenance"]["facts_used"],
        serde_json::json!(["is_active"])
    );
}

#[test]
fn evaluate_inactive_produces_no_verdicts() {
    let report = run_json(&["evaluate", "--facts", &fixture("facts_inactive.json")]);
    assert_eq!(report["verdicts"].as_array().map(Vec::len), Some(0));
}

#[test]
fn evaluate_without_facts_fails_with_missing_fact() {
    statute(&["evaluate", "--facts", &fixture("facts_empty.json")])
        .assert()
        .failure()
        .stderr(predicates::str::contains("missing required fact 'is_active'"));
}

#[test]
fn actions_all_gates_pass() {
    let report = run_json(&[
        "actions",
        "--facts",
        &fixture("facts_active.json"),
        "--entity-states",
        &fixture("states_pending.json"),
        "--persona",
        "admin",
    ]);
    let actions = report["actions"].as_array().expect("actions array");
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["flow_id"], "approval_flow");
    assert_eq!(actions[0]["entry_operation_id"], "approve_order");
    assert_eq!(report["blocked_actions"].as_array().map(Vec::len), Some(0));
}

#[test]
fn actions_unauthorized_persona() {
    let report = run_json(&[
        "actions",
        "--facts",
        &fixture("facts_active.json"),
        "--entity-states",
        &fixture("states_pending.json"),
        "--persona",
        "guest",
    ]);
    assert_eq!(report["actions"].as_array().map(Vec::len), Some(0));
    let blocked = report["blocked_actions"].as_array().expect("blocked array");
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0]["reason"]["type"], "PersonaNotAuthorized");
}

#[test]
fn actions_precondition_not_met() {
    let report = run_json(&[
        "actions",
        "--facts",
        &fixture("facts_inactive.json"),
        "--entity-states",
        &fixture("states_pending.json"),
        "--persona",
        "admin",
    ]);
    let blocked = report["blocked_actions"].as_array().expect("blocked array");
    assert_eq!(blocked[0]["reason"]["type"], "PreconditionNotMet");
    assert_eq!(
        blocked[0]["reason"]["missing_verdicts"],
        serde_json::json!(["account_active"])
    );
}

#[test]
fn actions_entity_not_in_source_state() {
    let report = run_json(&[
        "actions",
        "--facts",
        &fixture("facts_active.json"),
        "--entity-states",
        &fixture("states_approved.json"),
        "--persona",
        "admin",
    ]);
    let blocked = report["blocked_actions"].as_array().expect("blocked array");
    assert_eq!(blocked[0]["reason"]["type"], "EntityNotInSourceState");
    assert_eq!(blocked[0]["reason"]["current_state"], "approved");
    assert_eq!(blocked[0]["reason"]["required_state"], "pending");
}

#[test]
fn simulate_success_path() {
    let report = run_json(&[
        "simulate",
        "--flow",
        "approval_flow",
        "--facts",
        &fixture("facts_active.json"),
        "--persona",
        "admin",
    ]);
    assert_eq!(report["outcome"], "order_approved");
    assert_eq!(
        report["would_transition"],
        serde_json::json!([{"entity_id": "Order", "from": "pending", "to": "approved"}])
    );
    let steps = report["steps"].as_array().expect("steps array");
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0]["status"], "success");
}

#[test]
fn simulate_failure_path() {
    let report = run_json(&[
        "simulate",
        "--flow",
        "approval_flow",
        "--facts",
        &fixture("facts_inactive.json"),
        "--persona",
        "admin",
    ]);
    assert_eq!(report["outcome"], "approval_failed");
    assert_eq!(report["would_transition"].as_array().map(Vec::len), Some(0));
}

#[test]
fn simulate_unknown_flow_fails() {
    statute(&[
        "simulate",
        "--flow",
        "missing_flow",
        "--facts",
        &fixture("facts_active.json"),
        "--persona",
        "admin",
    ])
    .assert()
    .failure()
    .stderr(predicates::str::contains("flow 'missing_flow' not found"));
}

#[test]
fn output_flag_writes_report_to_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("report.json");
    statute(&[
        "--output",
        &out.to_string_lossy(),
        "evaluate",
        "--facts",
        &fixture("facts_active.json"),
    ])
    .assert()
    .success();
    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(&out).expect("report written"))
            .expect("report is JSON");
    assert_eq!(written["verdicts"].as_array().map(Vec::len), Some(1));
}
