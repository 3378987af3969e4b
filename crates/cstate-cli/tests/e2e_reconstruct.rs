//! E2E tests for `cstate reconstruct` and `cstate history`.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn cstate_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cstate"));
    cmd.current_dir(dir);
    cmd.env("CSTATE_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd.env_remove("FORMAT");
    cmd.env_remove("CSTATE_WORKERS");
    cmd
}

fn write_input(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}

/// Draft pull request that is marked ready, approved and passes CI after the
/// last sync.
fn github_changeset() -> Value {
    json!({
        "id": "gh-42",
        "snapshot": {
            "updated_at": "2024-06-01T00:00:00Z",
            "metadata": {
                "host": "github",
                "number": 42,
                "state": "OPEN",
                "is_draft": true,
                "created_at": "2024-05-20T00:00:00Z",
                "labels": [{"name": "bug"}]
            }
        },
        "events": [
            {"kind": "github:ready_for_review", "data": {"created_at": "2024-06-02T00:00:00Z"}},
            {
                "kind": "github:reviewed",
                "data": {"author": "alice", "state": "APPROVED", "submitted_at": "2024-06-03T00:00:00Z"}
            },
            {
                "kind": "github:commit_status",
                "data": {"context": "ci", "state": "SUCCESS", "received_at": "2024-06-03T01:00:00Z"}
            },
            {
                "kind": "github:labeled",
                "data": {"label": {"name": "api"}, "created_at": "2024-06-04T00:00:00Z"}
            }
        ]
    })
}

fn gitlab_changeset() -> Value {
    json!({
        "id": "gl-7",
        "snapshot": {
            "updated_at": "2024-06-01T00:00:00Z",
            "metadata": {
                "host": "gitlab",
                "iid": 7,
                "state": "opened",
                "created_at": "2024-05-01T00:00:00Z",
                "head_pipeline": {"id": 1, "status": "running", "created_at": "2024-05-31T00:00:00Z"}
            }
        },
        "events": [
            {"kind": "gitlab:merged", "data": {"created_at": "2024-06-02T00:00:00Z"}}
        ]
    })
}

/// Bitbucket Server snapshot that was synced without its commit list.
fn broken_changeset() -> Value {
    json!({
        "id": "bb-3",
        "snapshot": {
            "updated_at": "2024-06-01T00:00:00Z",
            "metadata": {
                "host": "bitbucket_server",
                "state": "OPEN",
                "created_date": 1_714_521_600_000_i64
            }
        }
    })
}

#[test]
fn single_changeset_json_is_an_object() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "one.json", &github_changeset());

    let out = cstate_cmd(dir.path())
        .args(["reconstruct", "--format", "json"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "reconstruct failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let report: Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(report["id"], "gh-42");
    assert_eq!(report["status"], "ok");
    assert_eq!(report["state"]["external_state"], "open");
    assert_eq!(report["state"]["review_state"], "approved");
    assert_eq!(report["state"]["check_state"], "passed");
    let labels: Vec<&str> = report["state"]["labels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(labels, ["api", "bug"]);
}

#[test]
fn batch_reports_each_changeset_in_order() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        dir.path(),
        "batch.json",
        &json!([github_changeset(), gitlab_changeset()]),
    );

    let out = cstate_cmd(dir.path())
        .args(["--json", "reconstruct", "--workers", "2"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(out.status.success());

    let reports: Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    let reports = reports.as_array().expect("array output");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["id"], "gh-42");
    assert_eq!(reports[1]["id"], "gl-7");
    assert_eq!(reports[1]["state"]["external_state"], "merged");
    assert_eq!(reports[1]["state"]["check_state"], "pending");
}

#[test]
fn failed_changeset_is_reported_and_exit_is_nonzero() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        dir.path(),
        "batch.json",
        &json!([broken_changeset(), github_changeset()]),
    );

    let out = cstate_cmd(dir.path())
        .args(["reconstruct", "--format", "json"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(!out.status.success());

    let reports: Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(reports[0]["status"], "failed");
    assert_eq!(reports[0]["error"]["code"], "E2002");
    assert!(
        reports[0]["error"]["message"]
            .as_str()
            .unwrap()
            .contains("no commit list")
    );
    // The failure does not stop the rest of the batch.
    assert_eq!(reports[1]["status"], "ok");

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("1 of 2 changesets were not reconstructed"));
}

#[test]
fn malformed_element_fails_alone() {
    let dir = TempDir::new().unwrap();
    let mut unparseable = github_changeset();
    unparseable["id"] = json!("gh-43");
    unparseable["events"] = json!([
        {"kind": "github:commit_status", "data": {"context": "ci", "state": "SUCCESS"}}
    ]);
    let input = write_input(
        dir.path(),
        "batch.json",
        &json!([github_changeset(), unparseable, gitlab_changeset()]),
    );

    let out = cstate_cmd(dir.path())
        .args(["reconstruct", "--format", "json"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(!out.status.success());

    let reports: Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    let reports = reports.as_array().expect("array output");
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0]["status"], "ok");
    assert_eq!(reports[1]["id"], "gh-43");
    assert_eq!(reports[1]["status"], "failed");
    assert_eq!(reports[1]["error"]["code"], "E1001");
    assert_eq!(reports[2]["status"], "ok");
    assert_eq!(reports[2]["state"]["external_state"], "merged");

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("1 of 3 changesets were not reconstructed"));
}

#[test]
fn fail_fast_from_project_config_skips_the_rest() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".cstate")).unwrap();
    fs::write(
        dir.path().join(".cstate/config.toml"),
        "[sync]\nworkers = 1\nfail_fast = true\n",
    )
    .unwrap();
    let input = write_input(
        dir.path(),
        "batch.json",
        &json!([broken_changeset(), github_changeset()]),
    );

    let out = cstate_cmd(dir.path())
        .args(["reconstruct", "--format", "json"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(!out.status.success());

    let reports: Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(reports[0]["status"], "failed");
    assert_eq!(reports[1]["status"], "skipped");
}

#[test]
fn text_output_is_tabular() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "one.json", &github_changeset());

    cstate_cmd(dir.path())
        .args(["reconstruct", "--format", "text"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "ID  EXTERNAL  REVIEW  CHECKS  LABELS\ngh-42  open  approved  passed  api,bug\n",
        ));
}

#[test]
fn stdin_input_is_accepted() {
    let dir = TempDir::new().unwrap();

    cstate_cmd(dir.path())
        .args(["reconstruct", "-", "--format", "text"])
        .write_stdin(serde_json::to_string(&gitlab_changeset()).unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("gl-7  merged"));
}

#[test]
fn mismatched_event_host_fails_with_code() {
    let dir = TempDir::new().unwrap();
    let mut changeset = gitlab_changeset();
    changeset["events"] = json!([
        {"kind": "github:closed", "data": {"created_at": "2024-06-02T00:00:00Z"}}
    ]);
    let input = write_input(dir.path(), "mixed.json", &changeset);

    cstate_cmd(dir.path())
        .args(["reconstruct", "--format", "text"])
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::contains("gl-7  error[E2001]"));
}

#[test]
fn unparseable_input_reports_input_error() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bad.json");
    fs::write(&input, "{\"snapshot\": 1}").unwrap();

    let out = cstate_cmd(dir.path())
        .args(["reconstruct", "--format", "json"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&out.stderr);
    let json_start = stderr.find('{').expect("JSON error on stderr");
    let err: Value = serde_json::Deserializer::from_str(&stderr[json_start..])
        .into_iter::<Value>()
        .next()
        .expect("one JSON value")
        .expect("valid JSON");
    assert_eq!(err["error"]["error_code"], "E1001");
}

#[test]
fn missing_input_file_fails() {
    let dir = TempDir::new().unwrap();

    cstate_cmd(dir.path())
        .args(["reconstruct", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.json"));
}

#[test]
fn history_lists_samples_oldest_first() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "one.json", &github_changeset());

    let out = cstate_cmd(dir.path())
        .args(["history", "--format", "json"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(out.status.success());

    let report: Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    let samples = report["samples"].as_array().expect("samples");
    assert_eq!(samples.len(), 3);
    assert_eq!(samples[0]["at"], "2024-05-20T00:00:00Z");
    assert_eq!(samples[0]["external_state"], "draft");
    assert_eq!(samples[1]["external_state"], "open");
    assert_eq!(samples[1]["review_state"], "pending");
    assert_eq!(samples[2]["review_state"], "approved");
}

#[test]
fn history_does_not_need_commits() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "bb.json", &broken_changeset());

    cstate_cmd(dir.path())
        .args(["history", "--format", "text"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("bb-3  2024-05-01T00:00:00Z  open  pending"));
}
