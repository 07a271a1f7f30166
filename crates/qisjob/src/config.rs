//! Job configuration.
//!
//! A [`JobConfig`] is built once per invocation through [`JobConfigBuilder`],
//! which checks every cross-field rule before anything touches the network.
//! Values come from, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. the defaults file (`~/.config/qisjob/config.yaml`, or `QISJOB_CONFIG`)
//! 3. `QISJOB_API_PROVIDER`, `QISJOB_SHOTS` and `QISJOB_QUBITS`
//! 4. explicit builder calls (command-line flags)

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use qisjob_adapter_sim::{Precision, SimulationMethod, SimulatorKind, SimulatorOptions};
use qisjob_hal::RunOptions;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{QisJobError, QisJobResult};
use crate::monitor::decode_line_prefix;
use crate::provider::ProviderKind;

/// Environment variable naming an alternative defaults file.
pub const CONFIG_PATH_VAR: &str = "QISJOB_CONFIG";

/// Defaults file, relative to the home directory.
pub const CONFIG_FILE: &str = ".config/qisjob/config.yaml";

/// Name of the cloud simulator selected by `--sim`.
pub const CLOUD_SIMULATOR: &str = "ibmq_qasm_simulator";

/// User defaults read from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_api_provider")]
    pub api_provider: String,

    #[serde(default)]
    pub hub: Option<String>,

    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub project: Option<String>,

    #[serde(default = "default_shots")]
    pub shots: u32,

    /// Minimum qubit count when picking a backend automatically.
    #[serde(default = "default_qubits")]
    pub qubits: u32,

    #[serde(default = "default_optimization_level")]
    pub optimization_level: u8,

    #[serde(default = "default_figure_basename")]
    pub figure_basename: String,
}

fn default_api_provider() -> String {
    "IBMQ".to_string()
}

fn default_shots() -> u32 {
    1024
}

fn default_qubits() -> u32 {
    5
}

fn default_optimization_level() -> u8 {
    1
}

fn default_figure_basename() -> String {
    "figout".to_string()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            api_provider: default_api_provider(),
            hub: None,
            group: None,
            project: None,
            shots: default_shots(),
            qubits: default_qubits(),
            optimization_level: default_optimization_level(),
            figure_basename: default_figure_basename(),
        }
    }
}

impl Defaults {
    /// Read defaults from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> QisJobResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            QisJobError::runtime_from(format!("Cannot read {}: {e}", path.display()), e)
        })?;
        serde_yaml_ng::from_str(&contents).map_err(|e| {
            QisJobError::argument(format!("Invalid defaults file {}: {e}", path.display()))
        })
    }

    /// The defaults file in effect, if one exists.
    pub fn path() -> Option<PathBuf> {
        match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => dirs::home_dir()
                .map(|home| home.join(CONFIG_FILE))
                .filter(|p| p.is_file()),
        }
    }

    /// File defaults (if any) with environment overrides applied.
    pub fn load() -> QisJobResult<Self> {
        let defaults = match Self::path() {
            Some(path) => {
                debug!(path = %path.display(), "loading defaults");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        Ok(defaults.merge_env())
    }

    /// Apply the `QISJOB_*` variables that are set.
    pub fn merge_env(mut self) -> Self {
        if let Ok(v) = std::env::var("QISJOB_API_PROVIDER") {
            self.api_provider = v;
        }
        if let Ok(v) = std::env::var("QISJOB_SHOTS") {
            match v.parse() {
                Ok(shots) => self.shots = shots,
                Err(_) => warn!("ignoring QISJOB_SHOTS={v}"),
            }
        }
        if let Ok(v) = std::env::var("QISJOB_QUBITS") {
            match v.parse() {
                Ok(qubits) => self.qubits = qubits,
                Err(_) => warn!("ignoring QISJOB_QUBITS={v}"),
            }
        }
        self
    }
}

/// A request to run on the in-process simulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalSimulator {
    pub kind: SimulatorKind,
    pub options: SimulatorOptions,
}

impl LocalSimulator {
    pub fn new(kind: SimulatorKind) -> Self {
        Self {
            kind,
            options: SimulatorOptions::default(),
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: SimulationMethod) -> Self {
        self.options.method = method;
        self
    }

    #[must_use]
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.options.precision = precision;
        self
    }
}

/// Whether circuit source may be executed as code.
///
/// `--qc` runs the input file as a Python program with the full rights of
/// the user. Nothing sandboxes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodeExecution {
    #[default]
    Forbidden,
    Unsafe,
}

/// Inspection commands. Each one replaces the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inspection {
    /// Instances visible to the IBMQ account.
    Providers,
    /// Configuration of `-b`.
    Configuration,
    /// Calibration of `-b`, optionally as of a past moment.
    Properties { at: Option<DateTime<Utc>> },
    /// Every backend of the provider.
    Backends,
    /// Status of `-b`, or of every backend.
    Status,
    /// The most recent jobs on `-b`.
    Jobs(usize),
    /// One job's record.
    JobRecord(String),
    /// One job's status and result.
    JobResult(String),
}

impl Inspection {
    fn needs_backend(&self) -> Option<&'static str> {
        match self {
            Inspection::Configuration => Some("configuration requires backend"),
            Inspection::Properties { .. } => Some("properties requires backend"),
            Inspection::Jobs(_) | Inspection::JobRecord(_) | Inspection::JobResult(_) => {
                Some("jobs or job_id or job_result also require backend")
            }
            _ => None,
        }
    }
}

/// Live job monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobMonitor {
    /// Written in front of every status line.
    pub line_prefix: String,
    /// Monitor output file, stdout when `None`.
    pub filepath: Option<PathBuf>,
}

/// What to print and write besides the CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    /// CSV destination, stdout when `None`.
    pub outfile: Option<PathBuf>,
    pub figure_basename: String,
    pub print_qasm: bool,
    pub print_job: bool,
    pub print_result: bool,
    pub memory: bool,
    pub histogram: bool,
    /// Decimals for the state city plot.
    pub state_city: Option<u32>,
    pub transpile: bool,
    pub show_schedule: bool,
    pub circuit_layout: bool,
    pub job_monitor: Option<JobMonitor>,
}

/// Everything one invocation needs. Immutable once built.
#[derive(Clone)]
#[non_exhaustive]
pub struct JobConfig {
    pub provider: ProviderKind,
    pub hub: Option<String>,
    pub group: Option<String>,
    pub project: Option<String>,
    pub token: Option<String>,
    pub url: Option<String>,
    pub backend: Option<String>,
    /// Minimum qubits when no backend is named.
    pub qubits: u32,
    pub shots: u32,
    pub optimization_level: u8,
    pub local_simulator: Option<LocalSimulator>,
    pub cloud_simulator: bool,
    pub qvm: bool,
    pub qvm_as: bool,
    pub noisy_sim: bool,
    pub include_path: Option<PathBuf>,
    pub qc_name: Option<String>,
    pub code_execution: CodeExecution,
    pub output: OutputOptions,
    pub inspection: Option<Inspection>,
    pub one_job: bool,
    pub verbosity: u8,
    pub show_version: bool,
    pub show_sdk_version: bool,
}

impl JobConfig {
    /// A builder seeded with built-in defaults.
    pub fn builder() -> JobConfigBuilder {
        JobConfigBuilder::from_defaults(&Defaults::default())
    }

    /// `hub/group/project`, when all three are set.
    pub fn instance(&self) -> Option<String> {
        match (&self.hub, &self.group, &self.project) {
            (Some(hub), Some(group), Some(project)) => Some(format!("{hub}/{group}/{project}")),
            _ => None,
        }
    }

    /// Options for every submission.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            shots: self.shots,
            memory: self.output.memory,
            optimization_level: self.optimization_level,
            seed: None,
        }
    }
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("provider", &self.provider)
            .field("hub", &self.hub)
            .field("group", &self.group)
            .field("project", &self.project)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("url", &self.url)
            .field("backend", &self.backend)
            .field("qubits", &self.qubits)
            .field("shots", &self.shots)
            .field("optimization_level", &self.optimization_level)
            .field("local_simulator", &self.local_simulator)
            .field("cloud_simulator", &self.cloud_simulator)
            .field("qvm", &self.qvm)
            .field("qvm_as", &self.qvm_as)
            .field("noisy_sim", &self.noisy_sim)
            .field("include_path", &self.include_path)
            .field("qc_name", &self.qc_name)
            .field("code_execution", &self.code_execution)
            .field("output", &self.output)
            .field("inspection", &self.inspection)
            .field("one_job", &self.one_job)
            .field("verbosity", &self.verbosity)
            .field("show_version", &self.show_version)
            .field("show_sdk_version", &self.show_sdk_version)
            .finish()
    }
}

/// Collects settings and validates them in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct JobConfigBuilder {
    api_provider: String,
    hub: Option<String>,
    group: Option<String>,
    project: Option<String>,
    token: Option<String>,
    url: Option<String>,
    backend: Option<String>,
    qubits: u32,
    shots: u32,
    optimization_level: u8,
    local_simulator: Option<LocalSimulator>,
    cloud_simulator: bool,
    qvm: bool,
    qvm_as: bool,
    noisy_sim: bool,
    include_path: Option<PathBuf>,
    qc_name: Option<String>,
    code_execution: CodeExecution,
    outfile: Option<PathBuf>,
    figure_basename: String,
    print_qasm: bool,
    print_job: bool,
    print_result: bool,
    memory: bool,
    histogram: bool,
    state_city: Option<u32>,
    transpile: bool,
    show_schedule: bool,
    circuit_layout: bool,
    use_job_monitor: bool,
    job_monitor_line: Option<String>,
    job_monitor_filepath: Option<PathBuf>,
    inspection: Option<Inspection>,
    one_job: bool,
    verbosity: u8,
    show_version: bool,
    show_sdk_version: bool,
}

macro_rules! setter {
    ($name:ident: $ty:ty) => {
        #[must_use]
        pub fn $name(mut self, value: $ty) -> Self {
            self.$name = value;
            self
        }
    };
}

impl JobConfigBuilder {
    pub fn from_defaults(defaults: &Defaults) -> Self {
        Self {
            api_provider: defaults.api_provider.clone(),
            hub: defaults.hub.clone(),
            group: defaults.group.clone(),
            project: defaults.project.clone(),
            token: None,
            url: None,
            backend: None,
            qubits: defaults.qubits,
            shots: defaults.shots,
            optimization_level: defaults.optimization_level,
            local_simulator: None,
            cloud_simulator: false,
            qvm: false,
            qvm_as: false,
            noisy_sim: false,
            include_path: None,
            qc_name: None,
            code_execution: CodeExecution::Forbidden,
            outfile: None,
            figure_basename: defaults.figure_basename.clone(),
            print_qasm: false,
            print_job: false,
            print_result: false,
            memory: false,
            histogram: false,
            state_city: None,
            transpile: false,
            show_schedule: false,
            circuit_layout: false,
            use_job_monitor: false,
            job_monitor_line: None,
            job_monitor_filepath: None,
            inspection: None,
            one_job: false,
            verbosity: 0,
            show_version: false,
            show_sdk_version: false,
        }
    }

    #[must_use]
    pub fn api_provider(mut self, name: impl Into<String>) -> Self {
        self.api_provider = name.into();
        self
    }

    #[must_use]
    pub fn backend(mut self, name: impl Into<String>) -> Self {
        self.backend = Some(name.into());
        self
    }

    setter!(hub: Option<String>);
    setter!(group: Option<String>);
    setter!(project: Option<String>);
    setter!(token: Option<String>);
    setter!(url: Option<String>);
    setter!(qubits: u32);
    setter!(shots: u32);
    setter!(optimization_level: u8);
    setter!(local_simulator: Option<LocalSimulator>);
    setter!(cloud_simulator: bool);
    setter!(qvm: bool);
    setter!(qvm_as: bool);
    setter!(noisy_sim: bool);
    setter!(include_path: Option<PathBuf>);
    setter!(qc_name: Option<String>);
    setter!(code_execution: CodeExecution);
    setter!(outfile: Option<PathBuf>);
    setter!(figure_basename: String);
    setter!(print_qasm: bool);
    setter!(print_job: bool);
    setter!(print_result: bool);
    setter!(memory: bool);
    setter!(histogram: bool);
    setter!(state_city: Option<u32>);
    setter!(transpile: bool);
    setter!(show_schedule: bool);
    setter!(circuit_layout: bool);
    setter!(use_job_monitor: bool);
    setter!(job_monitor_line: Option<String>);
    setter!(job_monitor_filepath: Option<PathBuf>);
    setter!(inspection: Option<Inspection>);
    setter!(one_job: bool);
    setter!(verbosity: u8);
    setter!(show_version: bool);
    setter!(show_sdk_version: bool);

    /// Check the settings against each other and freeze them.
    pub fn build(self) -> QisJobResult<JobConfig> {
        let provider: ProviderKind = self.api_provider.parse()?;

        if self.shots == 0 {
            return Err(QisJobError::argument("shots must be at least 1"));
        }
        if self.optimization_level > 3 {
            return Err(QisJobError::argument(format!(
                "optimization level {} is not in 0..=3",
                self.optimization_level
            )));
        }

        if provider == ProviderKind::Ibmq {
            if self.token.is_some() != self.url.is_some() {
                return Err(QisJobError::argument(
                    "token and url must be used together for IBMQ provider or not at all",
                ));
            }
            let parts = [&self.hub, &self.group, &self.project];
            let given = parts.iter().filter(|p| p.is_some()).count();
            if given != 0 && given != parts.len() {
                return Err(QisJobError::argument(
                    "hub, group and project must be given together",
                ));
            }
        }

        if self.local_simulator.is_some() && self.cloud_simulator {
            return Err(QisJobError::argument(
                "local simulator and cloud simulator are mutually exclusive",
            ));
        }
        if self.qvm && self.qvm_as {
            return Err(QisJobError::argument("qvm and qvm_as are mutually exclusive"));
        }
        if (self.qvm || self.qvm_as) && self.backend.is_none() {
            return Err(QisJobError::argument("qvm and qvm_as require backend"));
        }
        if self.noisy_sim && self.backend.is_none() {
            return Err(QisJobError::argument(
                "noisy_sim requires backend naming the noise reference",
            ));
        }

        if self.qc_name.is_some() {
            if self.code_execution != CodeExecution::Unsafe {
                return Err(QisJobError::argument(
                    "qc executes the source as Python; allow it with allow_code_exec",
                ));
            }
            if !cfg!(feature = "python") {
                return Err(QisJobError::argument(
                    "qc requires qisjob built with the `python` feature",
                ));
            }
        }

        if let Some(inspection) = &self.inspection {
            if let Some(message) = inspection.needs_backend() {
                if self.backend.is_none() {
                    return Err(QisJobError::argument(message));
                }
            }
            if *inspection == Inspection::Providers && provider != ProviderKind::Ibmq {
                return Err(QisJobError::argument(format!(
                    "providers is only available for IBMQ, not {provider}"
                )));
            }
        }

        let job_monitor = if self.use_job_monitor {
            let line_prefix = match &self.job_monitor_line {
                Some(spec) => decode_line_prefix(spec)?,
                None => "\r".to_string(),
            };
            Some(JobMonitor {
                line_prefix,
                filepath: self.job_monitor_filepath,
            })
        } else {
            None
        };

        Ok(JobConfig {
            provider,
            hub: self.hub,
            group: self.group,
            project: self.project,
            token: self.token,
            url: self.url,
            backend: self.backend,
            qubits: self.qubits,
            shots: self.shots,
            optimization_level: self.optimization_level,
            local_simulator: self.local_simulator,
            cloud_simulator: self.cloud_simulator,
            qvm: self.qvm,
            qvm_as: self.qvm_as,
            noisy_sim: self.noisy_sim,
            include_path: self.include_path,
            qc_name: self.qc_name,
            code_execution: self.code_execution,
            output: OutputOptions {
                outfile: self.outfile,
                figure_basename: self.figure_basename,
                print_qasm: self.print_qasm,
                print_job: self.print_job,
                print_result: self.print_result,
                memory: self.memory,
                histogram: self.histogram,
                state_city: self.state_city,
                transpile: self.transpile,
                show_schedule: self.show_schedule,
                circuit_layout: self.circuit_layout,
                job_monitor,
            },
            inspection: self.inspection,
            one_job: self.one_job,
            verbosity: self.verbosity,
            show_version: self.show_version,
            show_sdk_version: self.show_sdk_version,
        })
    }
}
