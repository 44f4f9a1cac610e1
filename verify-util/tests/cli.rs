// SPDX-FileCopyrightText: © 2024-2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;

fn cmd() -> Command {
    Command::cargo_bin("tdx-verify-util").unwrap()
}

fn write(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs_err::write(&path, content).unwrap();
    path
}

#[test]
fn verify_valid_evidence_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "tdx-evidence.json", br#"{"evidence": {}}"#);

    cmd()
        .args(["verify", "evidence"])
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("valid standard evidence"))
        .stdout(contains("\"valid\": true"));
}

#[test]
fn verify_incomplete_local_evidence_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "tdx-local-evidence.json", br#"{"tdx_status": {}}"#);

    cmd()
        .args(["verify", "evidence"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(contains("incomplete_structure"));
}

#[test]
fn verify_empty_token_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "tdx-token.json", br#"{"token": ""}"#);

    cmd()
        .args(["verify", "token"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(contains("missing_or_empty_token"));
}

#[test]
fn verify_quote_accepts_any_nonempty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "tdx-quote.bin", &[0xde, 0xad, 0xbe, 0xef]);

    cmd()
        .args(["verify", "quote"])
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("\"size\": 4"));
}

#[test]
fn verify_all_writes_report_and_prints_conclusion() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "tdx-evidence.json", br#"{"evidence": {}}"#);
    write(dir.path(), "tdx-token.json", br#"{"token": "a.b.c"}"#);
    let report_path = dir.path().join("verification-report.json");

    cmd()
        .arg("verify-all")
        .arg("--root")
        .arg(dir.path())
        .arg("--report")
        .arg(&report_path)
        .assert()
        .success()
        .stdout(contains("all 2 artifacts passed structural verification"));

    let content = fs_err::read_to_string(&report_path).unwrap();
    let report: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(report["summary"]["total"], 2);
    assert_eq!(report["summary"]["valid_count"], 2);
}

#[test]
fn verify_all_over_empty_universe_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("verification-report.json");

    cmd()
        .arg("verify-all")
        .arg("--root")
        .arg(dir.path())
        .arg("--report")
        .arg(&report_path)
        .assert()
        .failure()
        .stdout(contains("no attestation artifacts found"));
}

#[test]
fn verify_all_embeds_collaborator_tdx_status() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "tdx-quote.bin", b"quote bytes");
    let status_path = write(
        dir.path(),
        "status.json",
        br#"{"tdx_supported": true, "kernel_module_loaded": true, "guest_device_present": false}"#,
    );
    let report_path = dir.path().join("verification-report.json");

    cmd()
        .arg("verify-all")
        .arg("--root")
        .arg(dir.path())
        .arg("--report")
        .arg(&report_path)
        .arg("--tdx-status")
        .arg(&status_path)
        .assert()
        .success();

    let content = fs_err::read_to_string(&report_path).unwrap();
    let report: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(report["tdx_status"]["tdx_supported"], true);
    assert_eq!(report["tdx_status"]["guest_device_present"], false);
}
