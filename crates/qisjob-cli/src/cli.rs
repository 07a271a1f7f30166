//! Command-line arguments and their translation into a [`JobConfig`].

use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser, ValueEnum};
use qisjob::inspect::parse_datetime;
use qisjob::{
    CircuitSource, CodeExecution, Defaults, Inspection, JobConfig, JobConfigBuilder,
    LocalSimulator, QisJobResult,
};
use qisjob_adapter_sim::{Precision, SimulationMethod, SimulatorKind};

/// Load OpenQASM circuits and run them on IBMQ, QI, Forest, MQT or a local
/// simulator, writing the counts as CSV
#[derive(Parser, Debug)]
#[command(name = "qisjob", author, about, long_about = None, disable_version_flag = true)]
#[command(group(ArgGroup::new("target").args(["ibmq", "sim", "aer", "backend"])))]
#[command(group(ArgGroup::new("aer_kind").args(["qasm_simulator", "unitary_simulator"])))]
#[command(group(ArgGroup::new("gpu").args(["statevector_gpu", "unitary_gpu", "density_matrix_gpu"])))]
#[command(group(ArgGroup::new("job_query").args(["jobs", "job_id", "job_result"])))]
pub struct Cli {
    /// Circuit files; stdin when none are given
    pub filepath: Vec<PathBuf>,

    /// Use the least busy real IBMQ device (default)
    #[arg(short, long)]
    pub ibmq: bool,

    /// Use the IBMQ cloud qasm simulator
    #[arg(short, long)]
    pub sim: bool,

    /// Use the local simulator (statevector_simulator unless another is chosen)
    #[arg(short, long)]
    pub aer: bool,

    /// Use the named backend
    #[arg(short, long)]
    pub backend: Option<String>,

    /// With -a, use qasm_simulator
    #[arg(long, alias = "qasm_simulator", requires = "aer")]
    pub qasm_simulator: bool,

    /// With -a, use unitary_simulator
    #[arg(long, alias = "unitary_simulator", requires = "aer")]
    pub unitary_simulator: bool,

    /// With -a, use the statevector_gpu method
    #[arg(long, alias = "statevector_gpu", requires = "aer")]
    pub statevector_gpu: bool,

    /// With -a, use the unitary_gpu method
    #[arg(long, alias = "unitary_gpu", requires = "aer")]
    pub unitary_gpu: bool,

    /// With -a, use the density_matrix_gpu method
    #[arg(long, alias = "density_matrix_gpu", requires = "aer")]
    pub density_matrix_gpu: bool,

    /// With -a, floating point precision of the simulation
    #[arg(long, value_enum, requires = "aer")]
    pub precision: Option<PrecisionArg>,

    /// Remote API provider: IBMQ, QI, Forest or MQT
    #[arg(long, alias = "api_provider")]
    pub api_provider: Option<String>,

    /// IBMQ hub
    #[arg(long)]
    pub hub: Option<String>,

    /// IBMQ group
    #[arg(long)]
    pub group: Option<String>,

    /// IBMQ project
    #[arg(long)]
    pub project: Option<String>,

    /// List the hub/group/project instances of the IBMQ account
    #[arg(long)]
    pub providers: bool,

    /// Simulate locally with the noise of the backend named by -b
    #[arg(long, alias = "noisy_sim", requires = "backend")]
    pub noisy_sim: bool,

    /// Use the Forest QVM device named by -b
    #[arg(long, requires = "backend", conflicts_with = "qvm_as")]
    pub qvm: bool,

    /// Use a Forest QVM emulating the device named by -b
    #[arg(long, alias = "qvm_as", requires = "backend")]
    pub qvm_as: bool,

    /// List the provider's backends
    #[arg(long)]
    pub backends: bool,

    /// Run all circuits as one job
    #[arg(short = '1', long, alias = "one_job")]
    pub one_job: bool,

    /// With -p, properties as of Y,M,D[,h,m,s] local time
    #[arg(short, long, requires = "properties")]
    pub datetime: Option<String>,

    /// Print the configuration of the backend named by -b
    #[arg(short = 'g', long)]
    pub configuration: bool,

    /// Print the job record before and after the run
    #[arg(short, long)]
    pub job: bool,

    /// Print the N most recent jobs on the backend named by -b
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Print the record of a job on the backend named by -b
    #[arg(long, alias = "job_id", value_name = "ID")]
    pub job_id: Option<String>,

    /// Print the result of a job on the backend named by -b
    #[arg(long, alias = "job_result", value_name = "ID")]
    pub job_result: Option<String>,

    /// Print per-shot memory
    #[arg(short, long)]
    pub memory: bool,

    /// Directory searched for include files other than qelib1.inc
    #[arg(short = 'n', long, alias = "nuqasm2", value_name = "DIR")]
    pub include_path: Option<PathBuf>,

    /// Write CSV output to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub outfile: Option<PathBuf>,

    /// Print the calibration of the backend named by -b
    #[arg(short, long)]
    pub properties: bool,

    /// Minimum qubits when choosing a backend
    #[arg(short, long)]
    pub qubits: Option<u32>,

    /// Print the result of each job
    #[arg(short, long)]
    pub result: bool,

    /// Shots per circuit
    #[arg(short = 't', long)]
    pub shots: Option<u32>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace, -vvvv print configuration)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub warnings: bool,

    /// Print each circuit transpiled for the backend
    #[arg(short = 'x', long)]
    pub transpile: bool,

    /// With -x, print the schedule of the transpiled circuit
    #[arg(long, requires = "transpile")]
    pub showsched: bool,

    /// With -x, draw the circuit layout on the coupling map
    #[arg(long, alias = "circuit_layout", requires = "transpile")]
    pub circuit_layout: bool,

    /// Optimization level for transpiling, 0 to 3
    #[arg(long, alias = "optimization_level")]
    pub optimization_level: Option<u8>,

    /// Draw a histogram of each experiment's counts
    #[arg(long)]
    pub histogram: bool,

    /// Draw a state city plot, amplitudes rounded to N decimals
    #[arg(long, alias = "plot_state_city", value_name = "N")]
    pub plot_state_city: Option<u32>,

    /// Prefix of figure file names
    #[arg(long, alias = "figure_basename")]
    pub figure_basename: Option<String>,

    /// Write each circuit's OpenQASM ahead of its CSV
    #[arg(long)]
    pub qasm: bool,

    /// Run the source as Python and take the circuit in variable NAME
    #[arg(long, value_name = "NAME")]
    pub qc: Option<String>,

    /// Allow --qc to execute the source file
    #[arg(long, alias = "allow_code_exec")]
    pub allow_code_exec: bool,

    /// Print the status of the backend named by -b, or of every backend
    #[arg(long)]
    pub status: bool,

    /// API token
    #[arg(long)]
    pub token: Option<String>,

    /// API URL
    #[arg(long)]
    pub url: Option<String>,

    /// Print job status while waiting
    #[arg(long, alias = "use_job_monitor")]
    pub use_job_monitor: bool,

    /// Hex codes written before each monitor line
    #[arg(long, alias = "job_monitor_line", value_name = "HEX[,HEX]")]
    pub job_monitor_line: Option<String>,

    /// Write the job monitor to FILE instead of stdout
    #[arg(long, alias = "job_monitor_filepath", value_name = "FILE")]
    pub job_monitor_filepath: Option<PathBuf>,

    /// Print the qisjob version
    #[arg(long)]
    pub version: bool,

    /// Print the versions of the qisjob components
    #[arg(long, alias = "qiskit_version")]
    pub sdk_version: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecisionArg {
    Double,
    Single,
}

impl From<PrecisionArg> for Precision {
    fn from(arg: PrecisionArg) -> Self {
        match arg {
            PrecisionArg::Double => Precision::Double,
            PrecisionArg::Single => Precision::Single,
        }
    }
}

impl Cli {
    /// `tracing` filter for the verbosity flags.
    pub fn log_filter(&self) -> &'static str {
        if self.warnings {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Circuit sources in command-line order.
    pub fn sources(&self) -> Vec<CircuitSource> {
        self.filepath.iter().cloned().map(CircuitSource::File).collect()
    }

    fn local_simulator(&self) -> Option<LocalSimulator> {
        if !self.aer {
            return None;
        }
        let kind = if self.qasm_simulator {
            SimulatorKind::Qasm
        } else if self.unitary_simulator {
            SimulatorKind::Unitary
        } else {
            SimulatorKind::Statevector
        };
        let method = if self.statevector_gpu {
            SimulationMethod::StatevectorGpu
        } else if self.unitary_gpu {
            SimulationMethod::UnitaryGpu
        } else if self.density_matrix_gpu {
            SimulationMethod::DensityMatrixGpu
        } else {
            SimulationMethod::Automatic
        };
        let mut simulator = LocalSimulator::new(kind).with_method(method);
        if let Some(precision) = self.precision {
            simulator = simulator.with_precision(precision.into());
        }
        Some(simulator)
    }

    /// The first inspection asked for, in evaluation order.
    fn inspection(&self) -> QisJobResult<Option<Inspection>> {
        Ok(if self.providers {
            Some(Inspection::Providers)
        } else if self.configuration {
            Some(Inspection::Configuration)
        } else if self.properties {
            let at = self.datetime.as_deref().map(parse_datetime).transpose()?;
            Some(Inspection::Properties { at })
        } else if self.backends {
            Some(Inspection::Backends)
        } else if self.status {
            Some(Inspection::Status)
        } else if let Some(limit) = self.jobs {
            Some(Inspection::Jobs(limit))
        } else if let Some(id) = &self.job_id {
            Some(Inspection::JobRecord(id.clone()))
        } else {
            self.job_result.clone().map(Inspection::JobResult)
        })
    }

    /// Layer the flags over `defaults` and validate the result.
    pub fn job_config(&self, defaults: &Defaults) -> QisJobResult<JobConfig> {
        let mut builder = JobConfigBuilder::from_defaults(defaults)
            .token(self.token.clone())
            .url(self.url.clone())
            .local_simulator(self.local_simulator())
            .cloud_simulator(self.sim)
            .qvm(self.qvm)
            .qvm_as(self.qvm_as)
            .noisy_sim(self.noisy_sim)
            .include_path(self.include_path.clone())
            .qc_name(self.qc.clone())
            .code_execution(if self.allow_code_exec {
                CodeExecution::Unsafe
            } else {
                CodeExecution::Forbidden
            })
            .outfile(self.outfile.clone())
            .print_qasm(self.qasm)
            .print_job(self.job)
            .print_result(self.result)
            .memory(self.memory)
            .histogram(self.histogram)
            .state_city(self.plot_state_city)
            .transpile(self.transpile)
            .show_schedule(self.showsched)
            .circuit_layout(self.circuit_layout)
            .use_job_monitor(self.use_job_monitor)
            .job_monitor_line(self.job_monitor_line.clone())
            .job_monitor_filepath(self.job_monitor_filepath.clone())
            .inspection(self.inspection()?)
            .one_job(self.one_job)
            .verbosity(self.verbose)
            .show_version(self.version)
            .show_sdk_version(self.sdk_version);

        if let Some(provider) = &self.api_provider {
            builder = builder.api_provider(provider.as_str());
        }
        if let Some(backend) = &self.backend {
            builder = builder.backend(backend.as_str());
        }
        if self.hub.is_some() {
            builder = builder.hub(self.hub.clone());
        }
        if self.group.is_some() {
            builder = builder.group(self.group.clone());
        }
        if self.project.is_some() {
            builder = builder.project(self.project.clone());
        }
        if let Some(qubits) = self.qubits {
            builder = builder.qubits(qubits);
        }
        if let Some(shots) = self.shots {
            builder = builder.shots(shots);
        }
        if let Some(level) = self.optimization_level {
            builder = builder.optimization_level(level);
        }
        if let Some(basename) = &self.figure_basename {
            builder = builder.figure_basename(basename.clone());
        }
        builder.build()
    }
}
