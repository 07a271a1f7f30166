//! DDSIM backends.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use num_complex::Complex64;
use qisjob_hal::{
    bit_label, check_width, Backend, BackendConfiguration, BackendProperties, BackendStatus, Counts,
    ExperimentResult, HalError, HalResult, JobId, JobRecord, JobResult, JobStatus, RunOptions,
};
use qisjob_ir::Circuit;
use rustc_hash::FxHashMap;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{DdsimError, DdsimResult};
use crate::runner::{DdsimOutput, DdsimRunner};

/// Which DDSIM backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdsimKind {
    Qasm,
    Statevector,
}

impl DdsimKind {
    pub fn name(self) -> &'static str {
        match self {
            DdsimKind::Qasm => "qasm_simulator",
            DdsimKind::Statevector => "statevector_simulator",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "qasm_simulator" => Some(DdsimKind::Qasm),
            "statevector_simulator" => Some(DdsimKind::Statevector),
            _ => None,
        }
    }

    /// Decision diagrams keep wide sparse states cheap; a dense vector does
    /// not.
    fn max_qubits(self) -> u32 {
        match self {
            DdsimKind::Qasm => 128,
            DdsimKind::Statevector => 24,
        }
    }
}

impl fmt::Display for DdsimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct DdsimJob {
    record: JobRecord,
    result: Option<JobResult>,
}

/// A DDSIM simulator. Each submission runs the executable once per circuit.
pub struct DdsimBackend {
    runner: Arc<DdsimRunner>,
    kind: DdsimKind,
    configuration: BackendConfiguration,
    jobs: Arc<Mutex<FxHashMap<JobId, DdsimJob>>>,
}

impl DdsimBackend {
    pub fn new(runner: Arc<DdsimRunner>, kind: DdsimKind) -> Self {
        let mut configuration = BackendConfiguration::new(kind.name(), kind.max_qubits())
            .with_basis_gates([
                "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "rx", "ry", "rz", "p", "u",
                "cx", "cz", "swap", "cp", "ccx", "cswap",
            ])
            .with_max_shots(1_000_000)
            .simulator(true);
        configuration.memory = false;
        configuration.description = Some(format!(
            "MQT DDSIM {} via {}",
            kind.name(),
            runner.program().display()
        ));
        Self {
            runner,
            kind,
            configuration,
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    pub fn kind(&self) -> DdsimKind {
        self.kind
    }

    fn lock_jobs(&self) -> MutexGuard<'_, FxHashMap<JobId, DdsimJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_experiment(
        &self,
        circuit: &Circuit,
        options: &RunOptions,
    ) -> DdsimResult<ExperimentResult> {
        let qasm = qisjob_qasm::emit(circuit);
        let output = self
            .runner
            .run(
                &qasm,
                options.shots,
                options.seed,
                self.kind == DdsimKind::Statevector,
            )
            .await?;
        Ok(experiment_from_output(circuit, options.shots, output))
    }
}

/// Map DDSIM output onto the circuit's registers.
pub(crate) fn experiment_from_output(
    circuit: &Circuit,
    shots: u32,
    output: DdsimOutput,
) -> ExperimentResult {
    let mut experiment = ExperimentResult::new(circuit.name(), shots);
    if circuit.has_measurements() {
        let mut counts = Counts::new();
        for (key, n) in &output.measurement_results {
            let mut bits: Vec<bool> = key
                .chars()
                .rev()
                .filter(|c| matches!(c, '0' | '1'))
                .map(|c| c == '1')
                .collect();
            bits.resize(circuit.num_clbits(), false);
            counts.add(bit_label(circuit, &bits), *n);
        }
        experiment = experiment.with_counts(counts);
    }
    experiment.statevector = output
        .state_vector
        .map(|amps| amps.iter().map(|&[re, im]| Complex64::new(re, im)).collect());
    experiment.metadata = output.statistics;
    experiment
}

#[async_trait]
impl Backend for DdsimBackend {
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
        Ok(match self.runner.probe().await {
            Ok(()) => BackendStatus::active(self.name()),
            Err(e) => {
                debug!("ddsim probe failed: {e}");
                BackendStatus {
                    operational: false,
                    status_msg: format!("{} not runnable", self.runner.program().display()),
                    ..BackendStatus::active(self.name())
                }
            }
        })
    }

    #[instrument(skip(self, circuits, options), fields(backend = self.name(), circuits = circuits.len()))]
    async fn submit(&self, circuits: &[Circuit], options: &RunOptions) -> HalResult<JobId> {
        options.validate(&self.configuration)?;
        check_width(circuits, &self.configuration)?;
        if options.memory {
            warn!("DDSIM reports counts only; per-shot memory is not available");
        }

        let job_id = JobId::new(Uuid::new_v4().to_string());
        let mut results = Vec::with_capacity(circuits.len());
        let mut failure = None;
        for circuit in circuits {
            match self.run_experiment(circuit, options).await {
                Ok(experiment) => results.push(experiment),
                Err(DdsimError::Failed { message, .. }) => {
                    failure = Some(message);
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let record = JobRecord::new(job_id.clone(), self.name(), options.shots);
        let job = match failure {
            Some(reason) => {
                warn!(job = %job_id, %reason, "ddsim failed");
                DdsimJob {
                    record: record.with_status(JobStatus::Failed(reason)),
                    result: None,
                }
            }
            None => {
                info!(job = %job_id, "ddsim job completed");
                DdsimJob {
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
        job.result.clone().ok_or_else(|| {
            HalError::JobFailed(job.record.error_message.clone().unwrap_or_default())
        })
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

#[cfg(test)]
mod tests {
    use qisjob_ir::{ClbitId, QubitId};

    use super::*;

    #[test]
    fn test_counts_follow_registers() {
        let mut circuit = Circuit::with_size("split", 2, 0);
        circuit.add_creg("a", 1).unwrap();
        circuit.add_creg("b", 1).unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        circuit.measure(QubitId(1), ClbitId(1)).unwrap();

        let output = DdsimOutput {
            measurement_results: [("10".to_string(), 7), ("00".to_string(), 3)].into(),
            ..DdsimOutput::default()
        };
        let experiment = experiment_from_output(&circuit, 10, output);
        let counts = experiment.counts.unwrap();
        assert_eq!(counts.total_shots(), 10);
        assert_eq!(counts.get("1 0"), 7);
        assert_eq!(counts.get("0 0"), 3);
    }

    #[test]
    fn test_unmeasured_circuit_has_no_counts() {
        let mut circuit = Circuit::with_size("plus", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        let output = DdsimOutput {
            state_vector: Some(vec![[0.5f64.sqrt(), 0.0], [0.5f64.sqrt(), 0.0]]),
            ..DdsimOutput::default()
        };
        let experiment = experiment_from_output(&circuit, 1, output);
        assert!(experiment.counts.is_none());
        assert_eq!(experiment.statevector.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_executable_is_unavailable() {
        let backend = DdsimBackend::new(
            Arc::new(DdsimRunner::new("/nonexistent/ddsim_simple")),
            DdsimKind::Qasm,
        );
        assert!(!backend.status().await.unwrap().operational);
        let err = backend
            .submit(&[Circuit::bell().unwrap()], &RunOptions::new(8))
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::BackendUnavailable(_)));
    }
}
