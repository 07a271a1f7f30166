//! Whole runs through [`QisJob`] against the local simulator and a
//! scripted in-memory provider.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qisjob::{CircuitSource, Inspection, JobConfig, LocalSimulator, QisJob};
use qisjob_adapter_sim::SimulatorKind;
use qisjob_hal::{
    Backend, BackendConfiguration, BackendProperties, BackendStatus, HalError, HalResult, JobId,
    JobRecord, JobResult, JobStatus, Provider, RunOptions,
};
use qisjob_ir::Circuit;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

// ============================================================================
// Scripted backend
// ============================================================================

/// A device whose every job ends in the scripted status.
struct ScriptedBackend {
    configuration: BackendConfiguration,
    outcome: JobStatus,
    submitted: Mutex<Vec<JobId>>,
}

impl ScriptedBackend {
    fn new(name: &str, outcome: JobStatus) -> Self {
        Self {
            configuration: BackendConfiguration::new(name, 5),
            outcome,
            submitted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.configuration.backend_name
    }

    fn configuration(&self) -> &BackendConfiguration {
        &self.configuration
    }

    async fn properties(&self, _at: Option<DateTime<Utc>>) -> HalResult<Option<BackendProperties>> {
        Ok(None)
    }

    async fn status(&self) -> HalResult<BackendStatus> {
        Ok(BackendStatus::active(self.name()))
    }

    async fn submit(&self, _circuits: &[Circuit], _options: &RunOptions) -> HalResult<JobId> {
        let mut submitted = self.submitted.lock().unwrap_or_else(PoisonError::into_inner);
        let id = JobId::new(format!("scripted-{}", submitted.len()));
        submitted.push(id.clone());
        Ok(id)
    }

    async fn job_status(&self, _job_id: &JobId) -> HalResult<JobStatus> {
        Ok(self.outcome.clone())
    }

    async fn result(&self, job_id: &JobId) -> HalResult<JobResult> {
        Err(HalError::JobFailed(format!("{job_id} has no result")))
    }

    async fn retrieve_job(&self, job_id: &JobId) -> HalResult<JobRecord> {
        Ok(JobRecord::new(job_id.clone(), self.name(), 1024).with_status(self.outcome.clone()))
    }

    async fn jobs(&self, _limit: usize) -> HalResult<Vec<JobRecord>> {
        Ok(Vec::new())
    }
}

struct ScriptedProvider(Vec<Arc<dyn Backend>>);

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn backends(&self) -> HalResult<Vec<Arc<dyn Backend>>> {
        Ok(self.0.clone())
    }
}

fn failing_provider() -> Box<dyn Provider> {
    Box::new(ScriptedProvider(vec![Arc::new(ScriptedBackend::new(
        "scripted_device",
        JobStatus::Failed("calibration in progress".into()),
    ))]))
}

// ============================================================================
// Runs
// ============================================================================

#[tokio::test]
async fn test_bell_counts_on_local_simulator() {
    let config = JobConfig::builder()
        .local_simulator(Some(LocalSimulator::new(SimulatorKind::Qasm)))
        .shots(1024)
        .build()
        .unwrap();
    let outcome = QisJob::new(config)
        .run(&[CircuitSource::File(fixture("entangle.qasm"))])
        .await
        .unwrap();

    assert_eq!(outcome.backend.as_deref(), Some("qasm_simulator"));
    let [description, labels, counts] = &outcome.csv[0];
    assert!(description.starts_with("qasm_simulator "));
    for label in labels.trim_end_matches(';').split(';') {
        assert!(label == "00" || label == "11", "unexpected outcome {label}");
    }
    let total: u64 = counts
        .trim_end_matches(';')
        .split(';')
        .map(|c| c.parse::<u64>().unwrap())
        .sum();
    assert_eq!(total, 1024);
}

#[tokio::test]
async fn test_csv_written_to_outfile() {
    let dir = tempfile::tempdir().unwrap();
    let outfile = dir.path().join("counts.csv");
    let config = JobConfig::builder()
        .local_simulator(Some(LocalSimulator::new(SimulatorKind::Statevector)))
        .outfile(Some(outfile.clone()))
        .shots(32)
        .build()
        .unwrap();
    let outcome = QisJob::new(config)
        .run(&[CircuitSource::File(fixture("entangle.qasm"))])
        .await
        .unwrap();

    let written = std::fs::read_to_string(&outfile).unwrap();
    let expected: String = outcome.csv[0].iter().map(|line| format!("{line}\n")).collect();
    assert_eq!(written, expected);
}

#[tokio::test]
async fn test_histogram_figure() {
    let dir = tempfile::tempdir().unwrap();
    let basename = dir.path().join("fig").to_string_lossy().into_owned();
    let config = JobConfig::builder()
        .local_simulator(Some(LocalSimulator::new(SimulatorKind::Statevector)))
        .histogram(true)
        .state_city(Some(3))
        .figure_basename(basename)
        .shots(64)
        .build()
        .unwrap();
    QisJob::new(config)
        .run(&[CircuitSource::File(fixture("entangle.qasm"))])
        .await
        .unwrap();

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 2, "{names:?}");
    assert!(names[0].starts_with("fig_statevector_simulator_"));
    assert!(names[0].ends_with(".histogram.png"));
    assert!(names[1].ends_with(".state_city.png"));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failed_job_is_runtime_error_without_csv() {
    let dir = tempfile::tempdir().unwrap();
    let outfile = dir.path().join("counts.csv");
    let config = JobConfig::builder()
        .backend("scripted_device")
        .outfile(Some(outfile.clone()))
        .build()
        .unwrap();
    let err = QisJob::with_provider(config, failing_provider())
        .run(&[CircuitSource::File(fixture("entangle.qasm"))])
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 100);
    assert_eq!(err.to_string(), "Job failure calibration in progress");
    assert_eq!(std::fs::read_to_string(&outfile).unwrap(), "");
}

#[tokio::test]
async fn test_missing_backend_is_runtime_error() {
    let config = JobConfig::builder().backend("ibmq_atlantis").build().unwrap();
    let err = QisJob::with_provider(config, failing_provider())
        .run(&[CircuitSource::File(fixture("entangle.qasm"))])
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 100);
    assert_eq!(err.to_string(), "Backend ibmq_atlantis not found");
}

#[tokio::test]
async fn test_backend_listing_produces_no_csv() {
    let config = JobConfig::builder()
        .inspection(Some(Inspection::Backends))
        .build()
        .unwrap();
    let outcome = QisJob::with_provider(config, failing_provider())
        .run(&[CircuitSource::File(fixture("entangle.qasm"))])
        .await
        .unwrap();
    assert!(outcome.csv.is_empty());
    assert!(outcome.backend.is_none());
}

#[test]
fn test_token_without_url_is_argument_error() {
    let err = JobConfig::builder()
        .token(Some("abc123".into()))
        .build()
        .unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert_eq!(
        err.report(),
        "QisJobArgumentError : token and url must be used together for IBMQ provider or not at all"
    );
}
