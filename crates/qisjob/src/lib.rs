//! Run `OpenQASM` circuits as jobs on cloud or local quantum backends.
//!
//! `qisjob` loads circuits from files (or stdin), picks a backend from one
//! of several providers, submits the circuits, waits for them and writes
//! the measured counts as CSV. It can also inspect providers, backends and
//! past jobs instead of running anything.
//!
//! # Providers
//!
//! | Provider | Backends | Credentials |
//! |----------|----------|-------------|
//! | `IBMQ` | IBM Quantum devices and cloud simulator | saved account, or `--token`/`--url` |
//! | `QI` | Quantum Inspire | `--token`, `QI_TOKEN` or `~/.quantuminspire/config.json` |
//! | `Forest` | Rigetti QVM | none (`QVM_URL`) |
//! | `MQT` | DDSIM simulators | none |
//!
//! The local simulator (`--aer`) needs no provider at all.
//!
//! # Example
//!
//! ```no_run
//! use qisjob::{CircuitSource, JobConfig, LocalSimulator, QisJob};
//! use qisjob_adapter_sim::SimulatorKind;
//!
//! # async fn run() -> qisjob::QisJobResult<()> {
//! let config = JobConfig::builder()
//!     .local_simulator(Some(LocalSimulator::new(SimulatorKind::Qasm)))
//!     .shots(1024)
//!     .build()?;
//!
//! let source = CircuitSource::File("entangle.qasm".into());
//! let outcome = QisJob::new(config).run(&[source]).await?;
//! for [description, labels, counts] in &outcome.csv {
//!     println!("{description}\n{labels}\n{counts}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod inspect;
pub mod loader;
pub mod monitor;
pub mod plot;
pub mod provider;
pub mod select;
pub mod submit;

use std::io::Write;

use qisjob_hal::Provider;
use tracing::{debug, info};

pub use config::{
    CodeExecution, Defaults, Inspection, JobConfig, JobConfigBuilder, JobMonitor, LocalSimulator,
    OutputOptions,
};
pub use error::{QisJobError, QisJobResult};
pub use format::{CsvRecord, Output};
pub use loader::{CircuitSource, load_circuit};
pub use provider::{ProviderKind, ProviderSlot};
pub use select::choose_backend;

/// Version of this crate.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// The components a run goes through, with their versions.
pub fn sdk_versions() -> Vec<(&'static str, &'static str)> {
    [
        "qisjob-ir",
        "qisjob-qasm",
        "qisjob-compile",
        "qisjob-hal",
        "qisjob-adapter-sim",
        "qisjob-adapter-ibm",
        "qisjob-adapter-qi",
        "qisjob-adapter-forest",
        "qisjob-adapter-ddsim",
    ]
    .into_iter()
    .map(|name| (name, version()))
    .collect()
}

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// CSV records in the order they were written.
    pub csv: Vec<CsvRecord>,
    /// The backend the circuits ran on, if any ran.
    pub backend: Option<String>,
}

/// One invocation: a configuration and the provider it logs in to.
pub struct QisJob {
    config: JobConfig,
    providers: ProviderSlot,
}

impl QisJob {
    pub fn new(config: JobConfig) -> Self {
        Self {
            config,
            providers: ProviderSlot::new(),
        }
    }

    /// Use an already authenticated provider instead of logging in.
    pub fn with_provider(config: JobConfig, provider: Box<dyn Provider>) -> Self {
        Self {
            config,
            providers: ProviderSlot::with_provider(provider),
        }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Do what the configuration asks for.
    ///
    /// Version requests and inspections print and return without running
    /// anything. Otherwise every source is loaded and run: each as its own
    /// job, or all together in one job when `one_job` is set. No sources
    /// means stdin.
    pub async fn run(&self, sources: &[CircuitSource]) -> QisJobResult<RunOutcome> {
        let config = &self.config;
        if config.verbosity == 4 {
            submit::say(&format!("{config:#?}"))?;
            return Ok(RunOutcome::default());
        }
        if config.show_version || config.show_sdk_version {
            self.print_versions()?;
            return Ok(RunOutcome::default());
        }
        if let Some(inspection) = &config.inspection {
            let mut out = std::io::stdout();
            inspect::inspect(config, &self.providers, inspection, &mut out).await?;
            out.flush()
                .map_err(|e| QisJobError::runtime_from(format!("Output: {e}"), e))?;
            return Ok(RunOutcome::default());
        }

        let backend = choose_backend(config, &self.providers).await?;
        let mut out = Output::open(config.output.outfile.as_deref())?;
        let stdin = [CircuitSource::Stdin];
        let sources = if sources.is_empty() { &stdin[..] } else { sources };

        let mut csv = Vec::new();
        if config.one_job && sources.len() > 1 {
            let circuits = sources
                .iter()
                .map(|source| load_circuit(source, config))
                .collect::<QisJobResult<Vec<_>>>()?;
            info!(count = circuits.len(), "running as one job");
            csv.extend(submit::run_batch(config, backend.as_ref(), circuits, &mut out).await?);
        } else {
            for source in sources {
                debug!(source = %source.label(), "running");
                let circuit = load_circuit(source, config)?;
                csv.extend(submit::run_single(config, backend.as_ref(), circuit, &mut out).await?);
            }
        }
        Ok(RunOutcome {
            csv,
            backend: Some(backend.name().to_string()),
        })
    }

    fn print_versions(&self) -> QisJobResult<()> {
        if self.config.show_version {
            submit::say(&format!("qisjob {}", version()))?;
        }
        if self.config.show_sdk_version {
            for (name, version) in sdk_versions() {
                submit::say(&format!("{name} {version}"))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_versions_share_version() {
        let versions = sdk_versions();
        assert!(versions.iter().any(|(name, _)| *name == "qisjob-hal"));
        assert!(versions.iter().all(|(_, v)| *v == version()));
    }

    #[tokio::test]
    async fn test_version_runs_nothing() {
        let config = JobConfig::builder().show_version(true).build().unwrap();
        let outcome = QisJob::new(config).run(&[]).await.unwrap();
        assert_eq!(outcome, RunOutcome::default());
    }

    #[tokio::test]
    async fn test_text_source_on_simulator() {
        let config = JobConfig::builder()
            .local_simulator(Some(LocalSimulator::new(
                qisjob_adapter_sim::SimulatorKind::Qasm,
            )))
            .shots(64)
            .build()
            .unwrap();
        let source = CircuitSource::Text(
            "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[1];\ncreg c[1];\nx q[0];\nmeasure q -> c;\n"
                .into(),
        );
        let outcome = QisJob::new(config).run(&[source]).await.unwrap();
        assert_eq!(outcome.backend.as_deref(), Some("qasm_simulator"));
        assert_eq!(outcome.csv.len(), 1);
        assert_eq!(outcome.csv[0][1], "1;");
        assert_eq!(outcome.csv[0][2], "64;");
    }
}
