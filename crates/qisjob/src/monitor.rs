//! Waiting for jobs.
//!
//! With `--use-job-monitor` every poll writes one status line, prefixed by
//! the configured line discipline (a carriage return by default, so a
//! terminal shows a single updating line). Otherwise a spinner runs on
//! stderr while the backend is polled.

use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::time::Duration;

use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use qisjob_hal::{Backend, HalError, JobId, JobResult, JobStatus};
use tracing::{debug, info};

use crate::config::JobMonitor;
use crate::error::{QisJobError, QisJobResult};

/// Decode a comma-separated list of hex character codes (`0x0d,0x0a`).
pub fn decode_line_prefix(spec: &str) -> QisJobResult<String> {
    spec.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let digits = part
                .strip_prefix("0x")
                .or_else(|| part.strip_prefix("0X"))
                .unwrap_or(part);
            u32::from_str_radix(digits, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| {
                    QisJobError::argument(format!("job_monitor_line: {part} is not a hex character code"))
                })
        })
        .collect()
}

/// One monitor line, without the trailing newline.
pub fn status_line(prefix: &str, status: &JobStatus) -> String {
    format!("{prefix}Job Status: {}", status.monitor_message())
}

fn open_sink(monitor: &JobMonitor) -> QisJobResult<Box<dyn Write + Send>> {
    Ok(match &monitor.filepath {
        Some(path) => {
            info!("File for job monitor output is {}", path.display());
            let file = File::create(path).map_err(|e| {
                QisJobError::runtime_from(format!("Cannot open {}: {e}", path.display()), e)
            })?;
            Box::new(LineWriter::new(file))
        }
        None => Box::new(io::stdout()),
    })
}

/// Poll `job_id` until it finishes, writing a status line per poll.
pub async fn monitor_job(
    backend: &dyn Backend,
    job_id: &JobId,
    monitor: &JobMonitor,
) -> QisJobResult<JobStatus> {
    let mut sink = open_sink(monitor)?;
    let write_err = |e: io::Error| QisJobError::runtime_from(format!("Job monitor output: {e}"), e);
    loop {
        let status = backend.job_status(job_id).await?;
        write!(sink, "{}", status_line(&monitor.line_prefix, &status)).map_err(write_err)?;
        sink.flush().map_err(write_err)?;
        if status.is_terminal() {
            writeln!(sink).map_err(write_err)?;
            return Ok(status);
        }
        tokio::time::sleep(backend.poll_interval()).await;
    }
}

fn spinner(message: String) -> Option<ProgressBar> {
    if !Term::stderr().is_term() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Wait for a job and fetch its result.
///
/// A failed or cancelled job is a runtime error carrying the vendor's
/// reason.
pub async fn await_result(
    backend: &dyn Backend,
    job_id: &JobId,
    monitor: Option<&JobMonitor>,
) -> QisJobResult<JobResult> {
    let result = match monitor {
        Some(monitor) => match monitor_job(backend, job_id, monitor).await? {
            JobStatus::Completed => backend.result(job_id).await,
            JobStatus::Failed(reason) => Err(HalError::JobFailed(reason)),
            JobStatus::Cancelled => Err(HalError::JobCancelled),
            JobStatus::Queued | JobStatus::Running => backend.wait(job_id).await,
        },
        None => {
            let pb = spinner(format!("Waiting for job {job_id} on {}", backend.name()));
            let result = backend.wait(job_id).await;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            result
        }
    };
    debug!(job = %job_id, ok = result.is_ok(), "job finished");
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use qisjob_adapter_sim::{LocalSimulator, SimulatorKind};
    use qisjob_hal::RunOptions;
    use qisjob_ir::Circuit;

    use super::*;

    #[test]
    fn test_decode_line_prefix() {
        assert_eq!(decode_line_prefix("0x0d").unwrap(), "\r");
        assert_eq!(decode_line_prefix("0x0d,0x0a").unwrap(), "\r\n");
        assert_eq!(decode_line_prefix("0x3e, 0x20").unwrap(), "> ");
        assert_eq!(decode_line_prefix("41").unwrap(), "A");
        assert!(decode_line_prefix("0xzz").is_err());
        assert!(decode_line_prefix("0x110000").is_err());
    }

    #[test]
    fn test_status_line() {
        assert_eq!(
            status_line("\r", &JobStatus::Completed),
            "\rJob Status: job has successfully run"
        );
        assert_eq!(
            status_line("", &JobStatus::Failed("boom".into())),
            "Job Status: job incurred error: boom"
        );
    }

    #[tokio::test]
    async fn test_monitor_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.txt");
        let backend = LocalSimulator::new(SimulatorKind::Qasm);
        let job_id = backend
            .submit(&[Circuit::bell().unwrap()], &RunOptions::new(16))
            .await
            .unwrap();
        let monitor = JobMonitor {
            line_prefix: "\r".into(),
            filepath: Some(path.clone()),
        };
        let result = await_result(&backend, &job_id, Some(&monitor)).await.unwrap();
        assert_eq!(result.counts(0).unwrap().total_shots(), 16);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "\rJob Status: job has successfully run\n");
    }
}
