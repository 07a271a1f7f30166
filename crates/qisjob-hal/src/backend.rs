//! Backend trait, configuration, calibration properties and status.
//!
//! | Method | Kind | Returns |
//! |--------|------|---------|
//! | `name()` | sync | `&str` |
//! | `configuration()` | sync | `&BackendConfiguration` |
//! | `properties(at)` | async | `HalResult<Option<BackendProperties>>` |
//! | `status()` | async | `HalResult<BackendStatus>` |
//! | `submit()` | async | `HalResult<JobId>` |
//! | `job_status()` | async | `HalResult<JobStatus>` |
//! | `result()` | async | `HalResult<JobResult>` |
//! | `retrieve_job()` | async | `HalResult<JobRecord>` |
//! | `jobs(limit)` | async | `HalResult<Vec<JobRecord>>` |
//! | `wait()` | async, provided | `HalResult<JobResult>` |

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qisjob_ir::Circuit;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{HalError, HalResult};
use crate::job::{JobId, JobRecord, JobStatus};
use crate::result::JobResult;

/// Static description of a backend, cached when the handle is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfiguration {
    pub backend_name: String,
    pub backend_version: String,
    pub n_qubits: u32,
    pub simulator: bool,
    pub local: bool,
    pub basis_gates: Vec<String>,
    /// Directed qubit pairs; `None` means all-to-all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupling_map: Option<Vec<[u32; 2]>>,
    pub max_shots: u32,
    pub memory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BackendConfiguration {
    /// A configuration with IBM basis gates, no coupling restrictions and
    /// 8192 max shots.
    pub fn new(name: impl Into<String>, n_qubits: u32) -> Self {
        Self {
            backend_name: name.into(),
            backend_version: "1.0.0".into(),
            n_qubits,
            simulator: false,
            local: false,
            basis_gates: ["id", "rz", "sx", "x", "cx"].map(String::from).to_vec(),
            coupling_map: None,
            max_shots: 8192,
            memory: true,
            description: None,
        }
    }

    /// Mark as a simulator.
    #[must_use]
    pub fn simulator(mut self, local: bool) -> Self {
        self.simulator = true;
        self.local = local;
        self
    }

    /// Set the native gate names.
    #[must_use]
    pub fn with_basis_gates<S: Into<String>>(mut self, gates: impl IntoIterator<Item = S>) -> Self {
        self.basis_gates = gates.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict connectivity.
    #[must_use]
    pub fn with_coupling_map(mut self, edges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        self.coupling_map = Some(edges.into_iter().map(|(a, b)| [a, b]).collect());
        self
    }

    /// Set the maximum shots per job.
    #[must_use]
    pub fn with_max_shots(mut self, max_shots: u32) -> Self {
        self.max_shots = max_shots;
        self
    }
}

/// A named calibration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nduv {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub date: DateTime<Utc>,
}

impl Nduv {
    /// A value measured at `date`.
    pub fn new(name: &str, value: f64, unit: &str, date: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            date,
        }
    }
}

/// Calibration of one gate on specific qubits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateProperties {
    pub gate: String,
    pub qubits: Vec<u32>,
    pub parameters: Vec<Nduv>,
}

impl GateProperties {
    /// The `gate_error` parameter, if calibrated.
    pub fn gate_error(&self) -> Option<f64> {
        self.parameters
            .iter()
            .find(|p| p.name == "gate_error")
            .map(|p| p.value)
    }
}

/// Calibration snapshot of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendProperties {
    pub backend_name: String,
    pub backend_version: String,
    pub last_update_date: DateTime<Utc>,
    /// Per-qubit values such as `T1`, `T2`, `frequency`, `readout_error`.
    pub qubits: Vec<Vec<Nduv>>,
    pub gates: Vec<GateProperties>,
}

impl BackendProperties {
    /// A qubit parameter by name.
    pub fn qubit_property(&self, qubit: usize, name: &str) -> Option<f64> {
        self.qubits
            .get(qubit)?
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value)
    }

    /// Error rate of a gate on the given qubits.
    pub fn gate_error(&self, gate: &str, qubits: &[u32]) -> Option<f64> {
        self.gates
            .iter()
            .find(|g| g.gate == gate && g.qubits == qubits)
            .and_then(GateProperties::gate_error)
    }
}

/// Current health and queue of a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    pub backend_name: String,
    pub backend_version: String,
    pub operational: bool,
    pub pending_jobs: u32,
    pub status_msg: String,
}

impl BackendStatus {
    /// An operational backend with an empty queue.
    pub fn active(name: impl Into<String>) -> Self {
        Self {
            backend_name: name.into(),
            backend_version: "1.0.0".into(),
            operational: true,
            pending_jobs: 0,
            status_msg: "active".into(),
        }
    }
}

/// Options accompanying every submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    pub shots: u32,
    /// Return per-shot outcomes as well as counts.
    pub memory: bool,
    pub optimization_level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl RunOptions {
    /// Options for `shots` repetitions.
    pub fn new(shots: u32) -> Self {
        Self {
            shots,
            ..Self::default()
        }
    }

    /// Reject zero shots and shot counts above the backend maximum.
    pub fn validate(&self, configuration: &BackendConfiguration) -> HalResult<()> {
        if self.shots == 0 {
            return Err(HalError::InvalidShots("shots must be at least 1".into()));
        }
        if self.shots > configuration.max_shots {
            return Err(HalError::InvalidShots(format!(
                "{} shots requested, {} allows at most {}",
                self.shots, configuration.backend_name, configuration.max_shots
            )));
        }
        Ok(())
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            shots: 1024,
            memory: false,
            optimization_level: 1,
            seed: None,
        }
    }
}

/// Check circuit width against the backend.
pub fn check_width(circuits: &[Circuit], configuration: &BackendConfiguration) -> HalResult<()> {
    for circuit in circuits {
        if circuit.num_qubits() > configuration.n_qubits as usize {
            return Err(HalError::CircuitTooLarge(format!(
                "{} needs {} qubits, {} has {}",
                circuit.name(),
                circuit.num_qubits(),
                configuration.backend_name,
                configuration.n_qubits
            )));
        }
    }
    Ok(())
}

/// A named execution target.
///
/// `configuration()` is cached at construction; everything that talks to
/// the vendor is async. A submission of several circuits is one job whose
/// result holds one experiment per circuit, in order.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Static configuration.
    fn configuration(&self) -> &BackendConfiguration;

    /// Calibration data, optionally as of a past date. Simulators have none.
    async fn properties(&self, at: Option<DateTime<Utc>>) -> HalResult<Option<BackendProperties>>;

    /// Current status and queue length.
    async fn status(&self) -> HalResult<BackendStatus>;

    /// Submit circuits as one job.
    async fn submit(&self, circuits: &[Circuit], options: &RunOptions) -> HalResult<JobId>;

    /// Status of a job.
    async fn job_status(&self, job_id: &JobId) -> HalResult<JobStatus>;

    /// Result of a completed job.
    async fn result(&self, job_id: &JobId) -> HalResult<JobResult>;

    /// The record of one job.
    async fn retrieve_job(&self, job_id: &JobId) -> HalResult<JobRecord>;

    /// The most recent jobs, newest first.
    async fn jobs(&self, limit: usize) -> HalResult<Vec<JobRecord>>;

    /// Polling interval used by [`Backend::wait`].
    fn poll_interval(&self) -> Duration {
        Duration::from_secs(2)
    }

    /// Wait for a job to finish and return its result.
    async fn wait(&self, job_id: &JobId) -> HalResult<JobResult> {
        loop {
            let status = self.job_status(job_id).await?;
            trace!(job = %job_id, %status, "polled job");
            match status {
                JobStatus::Completed => return self.result(job_id).await,
                JobStatus::Failed(reason) => return Err(HalError::JobFailed(reason)),
                JobStatus::Cancelled => return Err(HalError::JobCancelled),
                JobStatus::Queued | JobStatus::Running => {
                    tokio::time::sleep(self.poll_interval()).await;
                }
            }
        }
    }
}
