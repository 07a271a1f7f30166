//! Quantum Inspire backend.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qisjob_hal::{
    bit_label, check_width, Backend, BackendConfiguration, BackendProperties, BackendStatus, Counts,
    ExperimentResult, HalError, HalResult, JobId, JobRecord, JobResult, JobStatus, RunOptions,
};
use qisjob_ir::Circuit;
use rustc_hash::FxHashMap;
use serde_json::json;
use tracing::{debug, instrument};

use crate::api::{BackendType, QiClient, QiJob, QiResultBody};
use crate::cqasm::{to_cqasm, QI_BASIS};

/// A Quantum Inspire backend type.
///
/// The service runs one circuit per job, so a multi-circuit submission is a
/// set of jobs whose ids are joined with commas.
pub struct QiBackend {
    client: Arc<QiClient>,
    backend_type: BackendType,
    configuration: BackendConfiguration,
    /// Circuits per submitted job, for mapping histograms to classical bits.
    submitted: Mutex<FxHashMap<u64, Circuit>>,
}

impl QiBackend {
    pub(crate) fn new(client: Arc<QiClient>, backend_type: BackendType) -> Self {
        let mut configuration =
            BackendConfiguration::new(backend_type.name.clone(), backend_type.number_of_qubits)
                .with_basis_gates(QI_BASIS)
                .with_max_shots(backend_type.max_number_of_shots);
        if !backend_type.is_hardware_backend {
            configuration = configuration.simulator(false);
        }
        if let Some(topology) = &backend_type.topology {
            let edges: Vec<(u32, u32)> = topology
                .edges
                .iter()
                .enumerate()
                .flat_map(|(q, neighbours)| neighbours.iter().map(move |&n| (q as u32, n)))
                .collect();
            if !edges.is_empty() {
                configuration = configuration.with_coupling_map(edges);
            }
        }
        configuration.description = backend_type.description.clone();
        Self {
            client,
            backend_type,
            configuration,
            submitted: Mutex::new(FxHashMap::default()),
        }
    }

    fn remember(&self, id: u64, circuit: Circuit) {
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, circuit);
    }

    fn circuit_for(&self, id: u64) -> Option<Circuit> {
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

/// Split a composite job id.
fn parts(job_id: &JobId) -> HalResult<Vec<u64>> {
    job_id
        .as_str()
        .split(',')
        .map(|p| {
            p.trim()
                .parse()
                .map_err(|_| HalError::JobNotFound(job_id.to_string()))
        })
        .collect()
}

fn status_of(job: &QiJob) -> JobStatus {
    match job.status.to_uppercase().as_str() {
        "RUNNING" => JobStatus::Running,
        "COMPLETE" => JobStatus::Completed,
        "CANCELLED" => JobStatus::Cancelled,
        _ => JobStatus::Queued,
    }
}

/// Fold the statuses of a job set: the first failure wins, then
/// cancellation, then anything still pending.
fn combine(statuses: impl IntoIterator<Item = JobStatus>) -> JobStatus {
    fn rank(status: &JobStatus) -> u8 {
        match status {
            JobStatus::Completed => 0,
            JobStatus::Queued => 1,
            JobStatus::Running => 2,
            JobStatus::Cancelled => 3,
            JobStatus::Failed(_) => 4,
        }
    }
    statuses
        .into_iter()
        .fold(JobStatus::Completed, |acc, status| {
            if rank(&status) > rank(&acc) { status } else { acc }
        })
}

/// Convert a probability histogram into counts over the circuit's
/// classical bits. Rounding drift goes to the most frequent outcome.
pub(crate) fn histogram_counts(body: &QiResultBody, shots: u32, circuit: Option<&Circuit>) -> Counts {
    let measures: Vec<(usize, usize)> = circuit
        .map(|c| {
            c.instructions()
                .iter()
                .filter(|i| i.is_measure())
                .flat_map(|i| i.qubits.iter().zip(&i.clbits).map(|(q, b)| (q.index(), b.index())))
                .collect()
        })
        .unwrap_or_default();
    let width = body
        .histogram
        .keys()
        .filter_map(|k| k.parse::<u64>().ok())
        .max()
        .map_or(1, |m| (u64::BITS - m.leading_zeros()).max(1) as usize);

    let mut counts = Counts::new();
    let mut assigned = 0u64;
    let mut best: Option<(String, u64)> = None;
    for (state, probability) in &body.histogram {
        let Ok(index) = state.parse::<u64>() else {
            continue;
        };
        let n = (probability * f64::from(shots)).round() as u64;
        if n == 0 {
            continue;
        }
        let label = match circuit {
            Some(circuit) => {
                let mut bits = vec![false; circuit.num_clbits()];
                for &(q, c) in &measures {
                    bits[c] = (index >> q) & 1 == 1;
                }
                bit_label(circuit, &bits)
            }
            None => format!("{index:0width$b}"),
        };
        assigned += n;
        if best.as_ref().is_none_or(|(_, b)| n > *b) {
            best = Some((label.clone(), n));
        }
        counts.add(label, n);
    }
    if let Some((label, _)) = best {
        let drift = i64::from(shots) - assigned as i64;
        if drift > 0 {
            counts.add(label, drift as u64);
        } else if drift < 0 {
            let fixed = counts.get(&label).saturating_sub(drift.unsigned_abs());
            counts = counts
                .iter()
                .map(|(l, n)| (l.to_string(), if l == label { fixed } else { n }))
                .collect();
        }
    }
    counts
}

#[async_trait]
impl Backend for QiBackend {
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
        let status = &self.backend_type.status;
        Ok(BackendStatus {
            operational: !status.eq_ignore_ascii_case("OFFLINE"),
            status_msg: if status.is_empty() {
                "active".into()
            } else {
                status.to_lowercase()
            },
            ..BackendStatus::active(self.name())
        })
    }

    #[instrument(skip(self, circuits, options), fields(backend = self.name()))]
    async fn submit(&self, circuits: &[Circuit], options: &RunOptions) -> HalResult<JobId> {
        options.validate(&self.configuration)?;
        check_width(circuits, &self.configuration)?;
        let mut ids = Vec::with_capacity(circuits.len());
        for circuit in circuits {
            let program = to_cqasm(circuit)?;
            let id = self
                .client
                .run(&self.backend_type, circuit.name(), program, options.shots)
                .await?;
            self.remember(id, circuit.clone());
            ids.push(id.to_string());
        }
        debug!(jobs = ids.len(), "submitted");
        Ok(JobId::new(ids.join(",")))
    }

    async fn job_status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let mut statuses = Vec::new();
        for id in parts(job_id)? {
            let mut status = status_of(&self.client.job(id).await?);
            if status == JobStatus::Completed {
                let body = self.client.result(id).await?;
                if let Some(reason) = body.failure() {
                    status = JobStatus::Failed(reason.to_string());
                }
            }
            statuses.push(status);
        }
        Ok(combine(statuses))
    }

    async fn result(&self, job_id: &JobId) -> HalResult<JobResult> {
        let mut results = Vec::new();
        for id in parts(job_id)? {
            let job = self.client.job(id).await?;
            let body = self.client.result(id).await?;
            if let Some(reason) = body.failure() {
                return Err(HalError::JobFailed(reason.to_string()));
            }
            let circuit = self.circuit_for(id);
            let counts = histogram_counts(&body, job.number_of_shots, circuit.as_ref());
            let mut experiment = ExperimentResult::new(job.name.clone(), job.number_of_shots)
                .with_counts(counts);
            if let Some(seconds) = body.execution_time_in_seconds {
                experiment
                    .metadata
                    .insert("execution_time_in_seconds".into(), json!(seconds));
            }
            results.push(experiment);
        }
        Ok(JobResult::new(self.name(), job_id.clone(), results))
    }

    async fn retrieve_job(&self, job_id: &JobId) -> HalResult<JobRecord> {
        let ids = parts(job_id)?;
        let mut statuses = Vec::new();
        let mut record = JobRecord::new(job_id.clone(), self.name(), 0);
        for id in ids {
            let job = self.client.job(id).await?;
            record.shots = job.number_of_shots;
            record.creation_date = job.queued_at;
            statuses.push(status_of(&job));
        }
        Ok(record.with_status(combine(statuses)))
    }

    async fn jobs(&self, limit: usize) -> HalResult<Vec<JobRecord>> {
        let mut jobs = self.client.jobs().await?;
        jobs.retain(|job| {
            job.backend_type
                .as_deref()
                .is_none_or(|url| url == self.backend_type.url)
        });
        jobs.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(jobs
            .iter()
            .take(limit)
            .map(|job| {
                let mut record = JobRecord::new(job.id.to_string(), self.name(), job.number_of_shots)
                    .with_status(status_of(job));
                record.creation_date = job.queued_at;
                record
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: &str) -> QiResultBody {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_histogram_to_counts_sums_to_shots() {
        let body = body(r#"{"histogram": {"0": 0.333, "3": 0.667}}"#);
        let counts = histogram_counts(&body, 1000, Some(&Circuit::bell().unwrap()));
        assert_eq!(counts.total_shots(), 1000);
        assert_eq!(counts.get("00"), 333);
        assert_eq!(counts.get("11"), 667);
    }

    #[test]
    fn test_histogram_follows_measure_map() {
        // qubit 0 measured into c[1]
        let mut circuit = Circuit::with_size("swapped", 2, 2);
        circuit
            .measure(qisjob_ir::QubitId(0), qisjob_ir::ClbitId(1))
            .unwrap();
        let counts = histogram_counts(&body(r#"{"histogram": {"1": 1.0}}"#), 10, Some(&circuit));
        assert_eq!(counts.get("10"), 10);
    }

    #[test]
    fn test_histogram_without_circuit() {
        let counts = histogram_counts(&body(r#"{"histogram": {"2": 0.5, "1": 0.5}}"#), 4, None);
        assert_eq!(counts.get("10"), 2);
        assert_eq!(counts.get("01"), 2);
    }

    #[test]
    fn test_combine_statuses() {
        use JobStatus::*;
        assert_eq!(combine([Completed, Completed]), Completed);
        assert_eq!(combine([Completed, Queued]), Queued);
        assert_eq!(combine([Queued, Running]), Running);
        assert_eq!(
            combine([Running, Failed("bad".into()), Cancelled]),
            Failed("bad".into())
        );
    }

    #[test]
    fn test_composite_ids() {
        assert_eq!(parts(&JobId::new("12, 13")).unwrap(), [12, 13]);
        assert!(matches!(
            parts(&JobId::new("abc")),
            Err(HalError::JobNotFound(_))
        ));
    }
}
