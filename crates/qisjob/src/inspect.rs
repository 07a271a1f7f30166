//! Inspection commands: look at a provider, a backend or past jobs instead
//! of running anything.

use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use qisjob_hal::{Backend, HalError, JobId, Provider};
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{Inspection, JobConfig};
use crate::error::{QisJobError, QisJobResult};
use crate::provider::ProviderSlot;

/// Parse `Y,M,D[,h,m,s]` as local time.
pub fn parse_datetime(spec: &str) -> QisJobResult<DateTime<Utc>> {
    let bad = || QisJobError::argument(format!("datetime {spec} is not Y,M,D[,h,m,s]"));
    let fields = spec
        .split(',')
        .map(|f| f.trim().parse::<u32>())
        .collect::<Result<Vec<u32>, _>>()
        .map_err(|_| bad())?;
    if !matches!(fields.len(), 3..=6) {
        return Err(bad());
    }
    let field = |i: usize| fields.get(i).copied().unwrap_or(0);
    let year = i32::try_from(field(0)).map_err(|_| bad())?;
    let naive = NaiveDate::from_ymd_opt(year, field(1), field(2))
        .and_then(|d| d.and_hms_opt(field(3), field(4), field(5)))
        .ok_or_else(bad)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(bad)
}

/// Find a backend by name; absent is a runtime error.
pub async fn lookup_backend(provider: &dyn Provider, name: &str) -> QisJobResult<Arc<dyn Backend>> {
    match provider.get_backend(name).await {
        Ok(Some(backend)) => Ok(backend),
        Ok(None) => Err(QisJobError::runtime(format!("Backend {name} not found"))),
        Err(e @ HalError::BackendNotFound(_)) => Err(QisJobError::runtime_from(
            format!("Backend {name} not found: {e}"),
            e,
        )),
        Err(e) => Err(e.into()),
    }
}

/// The backend named by `-b`, if any.
async fn named(config: &JobConfig, provider: &dyn Provider) -> QisJobResult<Option<Arc<dyn Backend>>> {
    match config.backend.as_deref() {
        Some(name) => lookup_backend(provider, name).await.map(Some),
        None => Ok(None),
    }
}

fn print_json(out: &mut dyn Write, value: &impl Serialize) -> QisJobResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| QisJobError::sdk_from(format!("Cannot format output: {e}"), e))?;
    print_line(out, &text)
}

fn print_line(out: &mut dyn Write, line: &str) -> QisJobResult<()> {
    writeln!(out, "{line}").map_err(|e| QisJobError::runtime_from(format!("Output: {e}"), e))
}

/// Run one inspection, printing to `out`.
pub async fn inspect(
    config: &JobConfig,
    providers: &ProviderSlot,
    inspection: &Inspection,
    out: &mut dyn Write,
) -> QisJobResult<()> {
    debug!(?inspection, "inspecting");
    let provider = providers.get(config).await?;

    match inspection {
        Inspection::Providers => {
            let instances = provider.instances().await.map_err(|e| {
                QisJobError::runtime_from(format!("Error fetching IBMQ providers: {e}"), e)
            })?;
            for instance in instances {
                print_line(out, &instance)?;
            }
        }
        Inspection::Configuration => {
            if let Some(backend) = named(config, provider).await? {
                print_json(out, backend.configuration())?;
            }
        }
        Inspection::Properties { at } => {
            if let Some(backend) = named(config, provider).await? {
                let properties = backend.properties(*at).await?;
                print_json(out, &properties)?;
            }
        }
        Inspection::Backends => {
            let backends = provider.backends().await?;
            trace!(count = backends.len(), "backends");
            for backend in backends {
                let config = backend.configuration();
                let kind = if config.simulator { ", simulator" } else { "" };
                print_line(
                    out,
                    &format!("{} ({} qubits{kind})", backend.name(), config.n_qubits),
                )?;
            }
        }
        Inspection::Status => {
            let backends = match named(config, provider).await? {
                Some(backend) => vec![backend],
                None => provider.backends().await?,
            };
            for backend in backends {
                print_json(out, &backend.status().await?)?;
            }
        }
        Inspection::Jobs(limit) => {
            if let Some(backend) = named(config, provider).await? {
                for record in backend.jobs(*limit).await? {
                    print_json(out, &record)?;
                }
            }
        }
        Inspection::JobRecord(id) => {
            if let Some(backend) = named(config, provider).await? {
                print_json(out, &backend.retrieve_job(&JobId::new(id.as_str())).await?)?;
            }
        }
        Inspection::JobResult(id) => {
            if let Some(backend) = named(config, provider).await? {
                let job_id = JobId::new(id.as_str());
                let record = backend.retrieve_job(&job_id).await?;
                print_line(out, &format!("Job {} {}", record.job_id, record.status))?;
                print_json(out, &backend.result(&job_id).await?)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_parse_datetime() {
        let t = parse_datetime("2021,3,15").unwrap().with_timezone(&Local);
        assert_eq!((t.year(), t.month(), t.day()), (2021, 3, 15));
        assert_eq!(t.hour(), 0);

        let t = parse_datetime("2021, 3, 15, 14, 30, 5").unwrap().with_timezone(&Local);
        assert_eq!((t.hour(), t.minute(), t.second()), (14, 30, 5));
    }

    #[test]
    fn test_parse_datetime_rejects() {
        for spec in ["2021,3", "2021,13,1", "2021,2,30", "yesterday", "2021,1,1,25,0,0", "1,2,3,4,5,6,7"] {
            let err = parse_datetime(spec).unwrap_err();
            assert_eq!(err.exit_code(), 1, "{spec}");
        }
    }
}
