//! QVM backends.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use num_complex::Complex64;
use qisjob_compile::Target;
use qisjob_hal::{
    bit_label, check_width, Backend, BackendConfiguration, BackendProperties, BackendStatus, Counts,
    ExperimentResult, HalError, HalResult, JobId, JobRecord, JobResult, JobStatus, RunOptions,
};
use qisjob_ir::Circuit;
use rustc_hash::FxHashMap;
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::api::QvmClient;
use crate::device::Device;
use crate::error::{ForestError, ForestResult};
use crate::quil::{quil_target, to_quil, to_quil_for, QUIL_BASIS, RIGETTI_BASIS};

/// Widest program a QVM will take.
pub const QVM_MAX_QUBITS: u32 = 30;

/// What a plain QVM backend returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QvmKind {
    /// Sampled counts.
    Qasm,
    /// Sampled counts plus the final wavefunction.
    Statevector,
}

impl QvmKind {
    pub fn name(self) -> &'static str {
        match self {
            QvmKind::Qasm => "qasm_simulator",
            QvmKind::Statevector => "statevector_simulator",
        }
    }

    /// Parse a backend name; `qvm` and `wavefunction_simulator` are
    /// accepted as well.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "qasm_simulator" | "qvm" => Some(QvmKind::Qasm),
            "statevector_simulator" | "wavefunction_simulator" => Some(QvmKind::Statevector),
            _ => None,
        }
    }
}

impl fmt::Display for QvmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct QvmJob {
    record: JobRecord,
    result: Option<JobResult>,
}

/// A QVM, either plain or emulating a device.
///
/// The QVM answers each request synchronously, so a job is finished by the
/// time `submit` returns and its outcome is kept in memory.
pub struct QvmBackend {
    client: Arc<QvmClient>,
    kind: QvmKind,
    configuration: BackendConfiguration,
    target: Target,
    jobs: Arc<Mutex<FxHashMap<JobId, QvmJob>>>,
}

impl QvmBackend {
    /// A plain QVM of the given kind.
    pub fn new(client: Arc<QvmClient>, kind: QvmKind) -> Self {
        let mut configuration = BackendConfiguration::new(kind.name(), QVM_MAX_QUBITS)
            .with_basis_gates(QUIL_BASIS)
            .with_max_shots(100_000)
            .simulator(true);
        configuration.description = Some(format!("Forest QVM at {}", client.url()));
        Self {
            client,
            kind,
            configuration,
            target: quil_target(),
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// A QVM restricted to a device's native gates and topology.
    pub fn emulating(client: Arc<QvmClient>, device: &Device) -> Self {
        let mut configuration = BackendConfiguration::new(device.name.clone(), device.num_qubits)
            .with_basis_gates(RIGETTI_BASIS)
            .with_max_shots(100_000)
            .simulator(true);
        if !device.edges.is_empty() {
            configuration = configuration.with_coupling_map(device.edges.iter().copied());
        }
        configuration.description = Some(format!("Forest QVM emulating {}", device.name));
        Self {
            client,
            kind: QvmKind::Qasm,
            configuration,
            target: device.target(),
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    pub fn kind(&self) -> QvmKind {
        self.kind
    }

    fn lock_jobs(&self) -> MutexGuard<'_, FxHashMap<JobId, QvmJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_experiment(
        &self,
        circuit: &Circuit,
        options: &RunOptions,
    ) -> ForestResult<ExperimentResult> {
        let program = to_quil_for(circuit, &self.target, options.optimization_level)?;
        let mut experiment = ExperimentResult::new(circuit.name(), options.shots);

        if circuit.has_measurements() {
            let rows = self
                .client
                .multishot(&program, options.shots, options.seed)
                .await?;
            let memory = shot_labels(circuit, &rows);
            debug!(circuit = circuit.name(), shots = memory.len(), "QVM multishot");
            experiment = experiment.with_counts(Counts::from_memory(&memory));
            if options.memory {
                experiment.memory = Some(memory);
            }
        }

        if self.kind == QvmKind::Statevector {
            let unmeasured = to_quil(&without_measurements(circuit)?)?;
            let mut amplitudes = self.client.wavefunction(&unmeasured, options.seed).await?;
            // the QVM sizes the state by the highest qubit touched
            let dim = 1usize << circuit.num_qubits();
            if amplitudes.len() < dim {
                amplitudes.resize(dim, Complex64::new(0.0, 0.0));
            }
            experiment.statevector = Some(amplitudes);
        }

        experiment.metadata.insert("quil".into(), json!(program));
        Ok(experiment)
    }
}

/// One bit-string label per QVM trial row.
pub(crate) fn shot_labels(circuit: &Circuit, rows: &[Vec<u8>]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            let bits: Vec<bool> = (0..circuit.num_clbits())
                .map(|c| row.get(c).is_some_and(|&b| b == 1))
                .collect();
            bit_label(circuit, &bits)
        })
        .collect()
}

fn without_measurements(circuit: &Circuit) -> ForestResult<Circuit> {
    if !circuit.has_terminal_measurements_only() {
        return Err(ForestError::Conversion(
            "statevector_simulator needs every measurement at the end of the circuit".into(),
        ));
    }
    let mut stripped = circuit.empty_like();
    for inst in circuit.instructions().iter().filter(|i| !i.is_measure()) {
        stripped
            .push(inst.clone())
            .map_err(|e| ForestError::Conversion(e.to_string()))?;
    }
    Ok(stripped)
}

#[async_trait]
impl Backend for QvmBackend {
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
        Ok(match self.client.version().await {
            Ok(version) => BackendStatus {
                backend_version: version,
                ..BackendStatus::active(self.name())
            },
            Err(e) => {
                debug!("QVM version check failed: {e}");
                BackendStatus {
                    operational: false,
                    status_msg: format!("QVM unreachable at {}", self.client.url()),
                    ..BackendStatus::active(self.name())
                }
            }
        })
    }

    #[instrument(skip(self, circuits, options), fields(backend = self.name(), circuits = circuits.len()))]
    async fn submit(&self, circuits: &[Circuit], options: &RunOptions) -> HalResult<JobId> {
        options.validate(&self.configuration)?;
        check_width(circuits, &self.configuration)?;

        let job_id = JobId::new(Uuid::new_v4().to_string());
        let mut results = Vec::with_capacity(circuits.len());
        let mut failure = None;
        for circuit in circuits {
            match self.run_experiment(circuit, options).await {
                Ok(experiment) => results.push(experiment),
                Err(ForestError::Qvm { message, .. }) => {
                    failure = Some(message);
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let record = JobRecord::new(job_id.clone(), self.name(), options.shots);
        let job = match failure {
            Some(reason) => {
                warn!(job = %job_id, %reason, "QVM rejected the program");
                QvmJob {
                    record: record.with_status(JobStatus::Failed(reason)),
                    result: None,
                }
            }
            None => {
                info!(job = %job_id, "QVM job completed");
                QvmJob {
                    record: record.with_status(JobStatus::Completed),
                    result: Some(JobResult::new(self.name(), job_id.clone(), results)),
                }
            }
        };
        self.lock_jobs().insert(job_id.clone(), job);
        Ok(job_id)
    }

    async fn job_status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        self.lock_jobs()
            .get(job_id)
            .map(|job| job.record.status.clone())
            .ok_or_else(|| HalError::JobNotFound(job_id.to_string()))
    }

    async fn result(&self, job_id: &JobId) -> HalResult<JobResult> {
        let jobs = self.lock_jobs();
        let job = jobs
            .get(job_id)
            .ok_or_else(|| HalError::JobNotFound(job_id.to_string()))?;
        match &job.result {
            Some(result) => Ok(result.clone()),
            None => Err(HalError::JobFailed(
                job.record.error_message.clone().unwrap_or_default(),
            )),
        }
    }

    async fn retrieve_job(&self, job_id: &JobId) -> HalResult<JobRecord> {
        self.lock_jobs()
            .get(job_id)
            .map(|job| job.record.clone())
            .ok_or_else(|| HalError::JobNotFound(job_id.to_string()))
    }

    async fn jobs(&self, limit: usize) -> HalResult<Vec<JobRecord>> {
        let mut records: Vec<JobRecord> =
            self.lock_jobs().values().map(|job| job.record.clone()).collect();
        records.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
        records.truncate(limit);
        Ok(records)
    }
}
