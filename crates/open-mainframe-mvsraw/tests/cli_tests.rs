//! Integration tests for the `mvsraw` CLI.

use std::path::Path;
use std::process::Command;

/// Run the CLI and return (stdout, stderr, exit code).
fn run_cli(args: &[&str]) -> (String, String, Option<i32>) {
    let output = Command::new(env!("CARGO_BIN_EXE_mvsraw"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code())
}

fn write_request(dir: &Path, json: &str) -> String {
    let path = dir.join("request.json");
    std::fs::write(&path, json).unwrap();
    path.display().to_string()
}

#[test]
fn test_help_command() {
    let (stdout, _, code) = run_cli(&["--help"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("args"));
}

#[test]
fn test_args_prints_argument_vector() {
    let dir = tempfile::tempdir().unwrap();
    let request = write_request(
        dir.path(),
        r#"{"program_name": "IDCAMS", "auth": true, "dds": [{"dd_dummy": {"dd_name": "sysin"}}]}"#,
    );
    let (stdout, stderr, code) = run_cli(&["args", "--request", &request]);
    assert_eq!(code, Some(0), "stderr: {stderr}");
    let argv: Vec<String> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(argv, ["mvscmdauth", "--pgm=IDCAMS", "--sysin=dummy"]);
}

#[test]
fn test_check_mode_report() {
    let dir = tempfile::tempdir().unwrap();
    let request = write_request(dir.path(), r#"{"program_name": "IEFBR14"}"#);
    let storage = dir.path().join("datasets");
    let (stdout, stderr, code) = run_cli(&[
        "run",
        "--request",
        &request,
        "--storage-dir",
        storage.to_str().unwrap(),
        "--check",
    ]);
    assert_eq!(code, Some(0), "stderr: {stderr}");
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["changed"], false);
    assert_eq!(report["ret_code"]["msg_txt"], "CHECK MODE: PROGRAM NOT RUN.");
    assert!(!storage.exists());
}

#[test]
fn test_invalid_request_fails() {
    let dir = tempfile::tempdir().unwrap();
    let request = write_request(dir.path(), r#"{"program_name": ""}"#);
    let (stdout, stderr, code) = run_cli(&["run", "--request", &request, "--check"]);
    assert_eq!(code, Some(1));
    assert!(stdout.is_empty());
    assert!(stderr.contains("THE z/OS PROGRAM CAN NOT BE EMPTY."));
}

#[test]
fn test_missing_request_file_fails() {
    let (_, stderr, code) = run_cli(&["run", "--request", "/no/such/request.json"]);
    assert_eq!(code, Some(1));
    assert!(stderr.contains("request"));
}

#[cfg(unix)]
#[test]
fn test_run_with_configured_launcher() {
    let dir = tempfile::tempdir().unwrap();
    let request = write_request(
        dir.path(),
        r#"{
            "program_name": "IEBGENER",
            "dds": [
                {"dd_dataset": {"dd_name": "sysut2", "data_set_name": "USER.OUT", "disposition": "new",
                                "disposition_normal": "delete", "record_format": "vb"}},
                {"dd_sysout": {"dd_name": "sysprint", "return_content": "text"}}
            ]
        }"#,
    );
    let config = dir.path().join("mvsraw.toml");
    std::fs::write(&config, "[launcher]\nunauthorized = \"echo\"\n").unwrap();
    let storage = dir.path().join("datasets");

    let (stdout, stderr, code) = run_cli(&[
        "run",
        "--request",
        &request,
        "--config",
        config.to_str().unwrap(),
        "--storage-dir",
        storage.to_str().unwrap(),
    ]);
    assert_eq!(code, Some(0), "stderr: {stderr}");
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["changed"], true);
    assert_eq!(report["ret_code"]["code"], 0);
    assert_eq!(report["ddnames"][0]["dataset"], "USER.OUT");
    assert_eq!(
        report["ddnames"][1]["content"],
        "--pgm=IEBGENER --sysut2=USER.OUT --sysprint=stdout\n"
    );
    assert!(!storage.join("USER/OUT").exists());
}
