//! Basic CLI surface checks.

use assert_cmd::Command;
use predicates::prelude::*;

fn statute() -> Command {
    Command::cargo_bin("statute").expect("binary builds")
}

#[test]
fn help_lists_subcommands() {
    statute()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("evaluate"))
        .stdout(predicate::str::contains("actions"))
        .stdout(predicate::str::contains("simulate"));
}

#[test]
fn version_prints() {
    statute()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("statute"));
}

#[test]
fn missing_bundle_file_fails_cleanly() {
    statute()
        .args(["--bundle", "no_such_bundle.json", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no_such_bundle.json"));
}

#[test]
fn invalid_bundle_reports_invalid() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "not json").expect("write fixture");
    statute()
        .args(["--bundle", &path.to_string_lossy(), "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid bundle"));
}
