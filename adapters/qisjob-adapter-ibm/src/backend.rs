//! IBM Quantum backend implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qisjob_hal::{
    check_width, Backend, BackendConfiguration, BackendProperties, BackendStatus, Counts,
    ExperimentResult, HalResult, JobId, JobRecord, JobResult, JobStatus, RunOptions,
};
use qisjob_ir::Circuit;
use qisjob_qasm::emit_qasm3;
use tracing::{debug, instrument};

use crate::api::{IbmClient, PubResult, RuntimeJob, SamplerOutput};
use crate::error::{IbmError, IbmResult};

/// One IBM Quantum device or cloud simulator.
pub struct IbmBackend {
    client: Arc<IbmClient>,
    configuration: BackendConfiguration,
}

impl IbmBackend {
    pub(crate) fn new(client: Arc<IbmClient>, configuration: BackendConfiguration) -> Self {
        Self {
            client,
            configuration,
        }
    }
}

/// Map the service's status words onto [`JobStatus`].
pub(crate) fn job_status(job: &RuntimeJob) -> JobStatus {
    match job.status_text().as_str() {
        "QUEUED" | "INITIALIZING" | "VALIDATING" => JobStatus::Queued,
        "RUNNING" => JobStatus::Running,
        "COMPLETED" | "DONE" => JobStatus::Completed,
        "CANCELLED" => JobStatus::Cancelled,
        "FAILED" | "ERROR" | "ERROR_RUNNING_JOB" | "ERROR_VALIDATING_JOB" => {
            JobStatus::Failed(job.reason().unwrap_or_else(|| "no reason given".into()))
        }
        other => {
            debug!(status = other, "unrecognised job status, treating as queued");
            JobStatus::Queued
        }
    }
}

pub(crate) fn job_record(job: &RuntimeJob, backend: &str) -> JobRecord {
    let mut record = JobRecord::new(
        job.id.as_str(),
        job.backend.clone().unwrap_or_else(|| backend.to_string()),
        job.shots(),
    )
    .with_status(job_status(job));
    record.creation_date = job.created;
    record.tags = job.tags.clone();
    if record.status.is_pending() {
        record.queue_position = job.queue_position;
    }
    record
}

/// Turn one register's hex samples into bit strings of its width.
fn register_labels(samples: &[String], num_bits: Option<u32>) -> IbmResult<Vec<String>> {
    let values = samples
        .iter()
        .map(|s| {
            let hex = s.trim_start_matches("0x");
            u64::from_str_radix(hex, 16)
                .map_err(|_| IbmError::MalformedResult(format!("sample '{s}' is not hex")))
        })
        .collect::<IbmResult<Vec<u64>>>()?;
    let width = num_bits.map_or_else(
        || {
            let max = values.iter().copied().max().unwrap_or(0);
            (u64::BITS - max.leading_zeros()).max(1)
        },
        |n| n.max(1),
    ) as usize;
    Ok(values.iter().map(|v| format!("{v:0width$b}")).collect())
}

/// Per-shot labels of one circuit, registers joined last-first.
pub(crate) fn experiment_from_pub(name: String, result: &PubResult) -> IbmResult<ExperimentResult> {
    let registers = result
        .data
        .values()
        .rev()
        .map(|reg| register_labels(&reg.samples, reg.num_bits))
        .collect::<IbmResult<Vec<_>>>()?;
    let shots = registers.first().map_or(0, Vec::len);
    let memory: Vec<String> = (0..shots)
        .map(|shot| {
            registers
                .iter()
                .filter_map(|reg| reg.get(shot).map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    let mut experiment = ExperimentResult::new(name, u32::try_from(shots).unwrap_or(u32::MAX));
    if !memory.is_empty() {
        experiment.counts = Some(Counts::from_memory(&memory));
        experiment.memory = Some(memory);
    }
    if let Some(serde_json::Value::Object(map)) = &result.metadata {
        experiment.metadata = map.clone();
    }
    Ok(experiment)
}

pub(crate) fn job_result(
    backend: &str,
    job_id: &JobId,
    output: &SamplerOutput,
) -> IbmResult<JobResult> {
    let results = output
        .results
        .iter()
        .enumerate()
        .map(|(i, pub_result)| experiment_from_pub(format!("circuit-{i}"), pub_result))
        .collect::<IbmResult<Vec<_>>>()?;
    Ok(JobResult::new(backend, job_id.clone(), results))
}

#[async_trait]
impl Backend for IbmBackend {
    fn name(&self) -> &str {
        &self.configuration.backend_name
    }

    fn configuration(&self) -> &BackendConfiguration {
        &self.configuration
    }

    #[instrument(skip(self), fields(backend = self.name()))]
    async fn properties(&self, at: Option<DateTime<Utc>>) -> HalResult<Option<BackendProperties>> {
        Ok(self.client.properties(self.name(), at).await?)
    }

    async fn status(&self) -> HalResult<BackendStatus> {
        Ok(self.client.status(self.name()).await?)
    }

    #[instrument(skip(self, circuits, options), fields(backend = self.name()))]
    async fn submit(&self, circuits: &[Circuit], options: &RunOptions) -> HalResult<JobId> {
        options.validate(&self.configuration)?;
        check_width(circuits, &self.configuration)?;
        let programs = circuits.iter().map(emit_qasm3).collect();
        let id = self.client.submit(self.name(), programs, options.shots).await?;
        debug!(job = %id, "submitted");
        Ok(JobId::new(id))
    }

    async fn job_status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let job = self.client.job(job_id.as_str()).await?;
        Ok(job_status(&job))
    }

    async fn result(&self, job_id: &JobId) -> HalResult<JobResult> {
        let output = self.client.results(job_id.as_str()).await?;
        Ok(job_result(self.name(), job_id, &output)?)
    }

    async fn retrieve_job(&self, job_id: &JobId) -> HalResult<JobRecord> {
        let job = self.client.job(job_id.as_str()).await?;
        Ok(job_record(&job, self.name()))
    }

    async fn jobs(&self, limit: usize) -> HalResult<Vec<JobRecord>> {
        let jobs = self.client.jobs(self.name(), limit).await?;
        Ok(jobs.iter().map(|job| job_record(job, self.name())).collect())
    }
}
