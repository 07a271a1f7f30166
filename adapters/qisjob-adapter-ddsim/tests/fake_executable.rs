//! Drive the backend against stand-in executables that print what
//! `ddsim_simple` would.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;

use qisjob_adapter_ddsim::{DdsimBackend, DdsimKind, DdsimRunner};
use qisjob_hal::{Backend, HalError, JobStatus, RunOptions};
use qisjob_ir::Circuit;

fn script(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("ddsim_simple");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn test_bell_counts_from_executable() {
    let dir = tempfile::tempdir().unwrap();
    let program = script(
        &dir,
        r#"echo '{"measurement_results": {"00": 500, "11": 524}, "statistics": {"seed": 0}}'"#,
    );
    let backend = DdsimBackend::new(Arc::new(DdsimRunner::new(program)), DdsimKind::Qasm);

    let job_id = backend
        .submit(&[Circuit::bell().unwrap()], &RunOptions::new(1024))
        .await
        .unwrap();
    assert_eq!(backend.job_status(&job_id).await.unwrap(), JobStatus::Completed);

    let result = backend.result(&job_id).await.unwrap();
    let counts = result.counts(0).unwrap();
    assert_eq!(counts.total_shots(), 1024);
    assert_eq!(counts.get("11"), 524);
    assert_eq!(backend.jobs(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_executable_sees_the_program() {
    let dir = tempfile::tempdir().unwrap();
    // echo back whether the file handed over holds a cx
    let program = script(
        &dir,
        r#"grep -q 'cx q\[0\],q\[1\]' "$2" && echo '{"measurement_results": {"11": 1}}' || exit 3"#,
    );
    let backend = DdsimBackend::new(Arc::new(DdsimRunner::new(program)), DdsimKind::Qasm);
    let job_id = backend
        .submit(&[Circuit::bell().unwrap()], &RunOptions::new(1))
        .await
        .unwrap();
    assert_eq!(backend.job_status(&job_id).await.unwrap(), JobStatus::Completed);
}

#[tokio::test]
async fn test_failed_run_is_a_failed_job() {
    let dir = tempfile::tempdir().unwrap();
    let program = script(&dir, "echo 'Unknown gate foo' >&2\nexit 1");
    let backend = DdsimBackend::new(Arc::new(DdsimRunner::new(program)), DdsimKind::Qasm);

    let job_id = backend
        .submit(&[Circuit::bell().unwrap()], &RunOptions::new(16))
        .await
        .unwrap();
    assert_eq!(
        backend.job_status(&job_id).await.unwrap(),
        JobStatus::Failed("Unknown gate foo".into())
    );
    let err = backend.wait(&job_id).await.unwrap_err();
    assert!(matches!(err, HalError::JobFailed(reason) if reason == "Unknown gate foo"));
}
