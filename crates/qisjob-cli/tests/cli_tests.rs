//! End-to-end tests of the `qisjob` binary.
//!
//! Every run gets an empty defaults file so the host's own configuration
//! and `QISJOB_*` variables cannot leak in.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn qisjob(args: &[&str]) -> Output {
    let dir = tempfile::tempdir().unwrap();
    let defaults = dir.path().join("config.yaml");
    std::fs::write(&defaults, "{}\n").unwrap();
    Command::new(env!("CARGO_BIN_EXE_qisjob"))
        .args(args)
        .current_dir(dir.path())
        .env("QISJOB_CONFIG", &defaults)
        .env_remove("QISJOB_API_PROVIDER")
        .env_remove("QISJOB_SHOTS")
        .env_remove("QISJOB_QUBITS")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================================================
// Runs
// ============================================================================

#[test]
fn test_bell_on_local_simulator() {
    let entangle = fixture("entangle.qasm");
    let output = qisjob(&["-a", "--qasm-simulator", "-t", "1024", entangle.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3, "{text}");
    assert!(lines[0].starts_with("qasm_simulator "));

    let labels: Vec<&str> = lines[1].trim_end_matches(';').split(';').collect();
    let counts: Vec<u64> = lines[2]
        .trim_end_matches(';')
        .split(';')
        .map(|c| c.parse().unwrap())
        .collect();
    assert!(labels.iter().all(|l| *l == "00" || *l == "11"), "{labels:?}");
    assert_eq!(counts.iter().sum::<u64>(), 1024);
}

#[test]
fn test_outfile_and_qasm() {
    let dir = tempfile::tempdir().unwrap();
    let outfile = dir.path().join("out.csv");
    let entangle = fixture("entangle.qasm");
    let output = qisjob(&[
        "-a",
        "--qasm_simulator",
        "--qasm",
        "-o",
        outfile.to_str().unwrap(),
        entangle.to_str().unwrap(),
        entangle.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).is_empty());

    let written = std::fs::read_to_string(&outfile).unwrap();
    assert_eq!(written.matches("OPENQASM 2.0;").count(), 2);
    assert_eq!(written.matches("qasm_simulator ").count(), 2);
}

#[test]
fn test_one_job_batch() {
    let entangle = fixture("entangle.qasm");
    let path = entangle.to_str().unwrap();
    let output = qisjob(&["-a", "--qasm-simulator", "-1", "-t", "100", path, path]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output).lines().count(), 6);
}

#[test]
fn test_unmeasured_circuit_writes_no_csv() {
    let circuit = fixture("unmeasured.qasm");
    let output = qisjob(&["-a", "--unitary-simulator", circuit.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(!stdout(&output).contains(';'));
}

// ============================================================================
// Inspections
// ============================================================================

#[test]
fn test_version() {
    let output = qisjob(&["--version"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), format!("qisjob {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_backend_listing_writes_no_csv() {
    let output = qisjob(&["--api-provider", "MQT", "--backends"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(!text.is_empty());
    assert!(!text.contains(';'));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_token_without_url() {
    let output = qisjob(&["--token", "abc123"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stderr(&output).trim(),
        "QisJobArgumentError : token and url must be used together for IBMQ provider or not at all"
    );
}

#[test]
fn test_jobs_need_backend() {
    let output = qisjob(&["--jobs", "3"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("jobs or job_id or job_result also require backend"));
}

#[test]
fn test_usage_error_is_argument_error() {
    let output = qisjob(&["-d", "2021,1,1"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_missing_backend() {
    let entangle = fixture("entangle.qasm");
    let output = qisjob(&[
        "--api-provider",
        "MQT",
        "-b",
        "no_such_backend",
        entangle.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(100));
    assert!(
        stderr(&output).starts_with("QisJobRuntimeError : Backend no_such_backend not found"),
        "{}",
        stderr(&output)
    );
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_missing_file() {
    let output = qisjob(&["-a", "/nonexistent/circuit.qasm"]);
    assert_eq!(output.status.code(), Some(100));
    assert!(stderr(&output).starts_with("QisJobRuntimeError : "));
}

#[test]
fn test_gpu_method_is_sdk_error() {
    let entangle = fixture("entangle.qasm");
    let output = qisjob(&["-a", "--statevector-gpu", entangle.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(200));
    assert!(stderr(&output).starts_with("QisJobSdkError : "));
}
