//! Submitting circuits and turning results into output.

use std::io::Write;

use num_complex::Complex64;
use qisjob_compile::{
    BasisGates, CouplingMap, InstructionDurations, Target, Transpiled, schedule_asap, transpile,
};
use qisjob_adapter_sim::SimulatorKind;
use qisjob_hal::{Backend, BackendConfiguration, JobId, JobResult};
use qisjob_ir::Circuit;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::JobConfig;
use crate::error::{QisJobError, QisJobResult};
use crate::format::{CsvRecord, Output, csv_lines, description, figure_path};
use crate::monitor::await_result;
use crate::plot;

/// The compile target described by a backend's configuration.
pub fn target_for(configuration: &BackendConfiguration) -> Target {
    let basis = if configuration.basis_gates.is_empty() {
        BasisGates::universal()
    } else {
        BasisGates::new(&configuration.basis_gates)
    };
    let target = Target::new(basis);
    match &configuration.coupling_map {
        Some(edges) => target.with_coupling_map(CouplingMap::from_edges(
            configuration.n_qubits,
            edges.iter().map(|&[a, b]| (a, b)),
        )),
        None => target,
    }
}

pub(crate) fn say(text: &str) -> QisJobResult<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{text}").map_err(|e| QisJobError::runtime_from(format!("Output: {e}"), e))
}

fn say_json(value: &impl Serialize) -> QisJobResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| QisJobError::sdk_from(format!("Cannot format output: {e}"), e))?;
    say(&text)
}

fn compile(circuit: &Circuit, target: &Target, level: u8) -> QisJobResult<Transpiled> {
    Ok(transpile(circuit, target, level)?)
}

/// Print the transpiled form of `circuit` and, on request, its schedule and
/// layout figure. The circuit itself is left alone.
fn show_transpiled(config: &JobConfig, backend: &dyn Backend, circuit: &Circuit) -> QisJobResult<()> {
    let target = target_for(backend.configuration());
    let transpiled = compile(circuit, &target, config.optimization_level)?;
    say(qisjob_qasm::emit(&transpiled.circuit).trim_end())?;

    if config.output.show_schedule {
        let schedule = schedule_asap(&transpiled.circuit, &InstructionDurations::transmon());
        say(&schedule.to_string())?;
    }
    if config.output.circuit_layout {
        let coupling = target
            .coupling_map
            .unwrap_or_else(|| CouplingMap::new(backend.configuration().n_qubits));
        let layout: Vec<(u32, u32)> = transpiled
            .properties
            .layout
            .as_ref()
            .map(|l| l.iter().map(|(v, p)| (v.0, p)).collect())
            .unwrap_or_else(|| (0..circuit.num_qubits() as u32).map(|q| (q, q)).collect());
        let path = figure_path(&config.output.figure_basename, backend.name(), "plot_circuit.png");
        plot::circuit_layout(&path, coupling.num_qubits(), coupling.edges(), &layout)?;
    }
    Ok(())
}

/// The circuits as they will be submitted.
///
/// Noisy simulation runs the circuits compiled to the reference device;
/// everything else runs the circuits as loaded.
fn prepare(config: &JobConfig, backend: &dyn Backend, circuits: Vec<Circuit>) -> QisJobResult<Vec<Circuit>> {
    if config.output.transpile {
        for circuit in &circuits {
            show_transpiled(config, backend, circuit)?;
        }
    }
    if !config.noisy_sim {
        return Ok(circuits);
    }
    let target = target_for(backend.configuration());
    circuits
        .iter()
        .map(|c| compile(c, &target, config.optimization_level).map(|t| t.circuit))
        .collect()
}

async fn execute(
    config: &JobConfig,
    backend: &dyn Backend,
    circuits: &[Circuit],
) -> QisJobResult<JobResult> {
    let job_id: JobId = backend.submit(circuits, &config.run_options()).await?;
    info!(job = %job_id, backend = backend.name(), "submitted");

    if config.output.print_job {
        say("Before run:")?;
        say_json(&backend.retrieve_job(&job_id).await?)?;
    }
    let result = await_result(backend, &job_id, config.output.job_monitor.as_ref()).await?;
    if config.output.print_job {
        say("After run:")?;
        say_json(&backend.retrieve_job(&job_id).await?)?;
    }
    if config.output.print_result {
        say_json(&result)?;
    }
    Ok(result)
}

/// Run one circuit as its own job.
#[instrument(skip_all, fields(circuit = circuit.name()))]
pub async fn run_single(
    config: &JobConfig,
    backend: &dyn Backend,
    circuit: Circuit,
    out: &mut Output,
) -> QisJobResult<Vec<CsvRecord>> {
    let circuits = prepare(config, backend, vec![circuit])?;
    let result = execute(config, backend, &circuits).await?;
    process_results(config, backend.name(), &circuits, &result, out)
}

/// Run every circuit in one job. A failure anywhere fails the batch.
#[instrument(skip_all, fields(circuits = circuits.len()))]
pub async fn run_batch(
    config: &JobConfig,
    backend: &dyn Backend,
    circuits: Vec<Circuit>,
    out: &mut Output,
) -> QisJobResult<Vec<CsvRecord>> {
    if circuits.is_empty() {
        return Ok(Vec::new());
    }
    let circuits = prepare(config, backend, circuits)?;
    debug!(count = circuits.len(), "submitting batch");
    let result = execute(config, backend, &circuits).await?;
    process_results(config, backend.name(), &circuits, &result, out)
}

fn format_statevector(statevector: &[Complex64]) -> String {
    let amplitudes: Vec<String> = statevector.iter().map(ToString::to_string).collect();
    format!("[{}]", amplitudes.join(", "))
}

fn prints_statevector(config: &JobConfig) -> bool {
    !config.noisy_sim
        && config
            .local_simulator
            .as_ref()
            .is_some_and(|local| local.kind == SimulatorKind::Statevector)
}

/// Write the output for every experiment of a finished job.
///
/// Returns the CSV records written, in circuit order.
pub fn process_results(
    config: &JobConfig,
    backend_name: &str,
    circuits: &[Circuit],
    result: &JobResult,
    out: &mut Output,
) -> QisJobResult<Vec<CsvRecord>> {
    let mut records = Vec::new();
    for (index, circuit) in circuits.iter().enumerate() {
        let experiment = result.results.get(index).ok_or_else(|| {
            QisJobError::runtime(format!(
                "Job {} returned no result for circuit {}",
                result.job_id,
                circuit.name()
            ))
        })?;

        if config.output.print_qasm {
            out.write_line(qisjob_qasm::emit(circuit).trim_end())?;
        }
        if config.output.memory {
            match &experiment.memory {
                Some(memory) => say_json(memory)?,
                None => warn!(backend = backend_name, "backend returned no memory"),
            }
        }
        if prints_statevector(config) {
            if let Some(statevector) = &experiment.statevector {
                say(&format_statevector(statevector))?;
            }
        }

        let Some(counts) = &experiment.counts else {
            debug!(circuit = circuit.name(), "no counts");
            continue;
        };
        info!(circuit = circuit.name(), ?counts, "counts");
        let Some(record) = csv_lines(&description(backend_name), counts) else {
            continue;
        };
        out.write_record(&record)?;

        let output = &config.output;
        if output.histogram {
            let path = figure_path(&output.figure_basename, backend_name, "histogram.png");
            plot::histogram(&path, counts)?;
        }
        if let Some(decimals) = output.state_city {
            let statevector = experiment.statevector.as_deref().ok_or_else(|| {
                QisJobError::runtime(format!(
                    "State city plot needs a statevector, which {backend_name} does not return"
                ))
            })?;
            let path = figure_path(&output.figure_basename, backend_name, "state_city.png");
            plot::state_city(&path, statevector, decimals)?;
        }
        records.push(record);
    }
    out.flush()
        .map_err(|e| QisJobError::runtime_from(format!("Output: {e}"), e))?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use qisjob_adapter_sim::{LocalSimulator as Simulator, SimulatorOptions};
    use qisjob_hal::{Counts, ExperimentResult, NoiseProfile};

    use super::*;
    use crate::config::LocalSimulator;

    fn bell() -> Circuit {
        Circuit::bell().unwrap()
    }

    fn finished(counts: Option<Counts>) -> JobResult {
        let mut experiment = ExperimentResult::new("bell", 10);
        experiment.counts = counts;
        JobResult::new("mock", JobId::new("job-1"), vec![experiment])
    }

    #[test]
    fn test_target_for_configuration() {
        let configuration = BackendConfiguration::new("line", 3)
            .with_basis_gates(["rz", "sx", "cx"])
            .with_coupling_map([(0, 1), (1, 2)]);
        let target = target_for(&configuration);
        let coupling = target.coupling_map.unwrap();
        assert!(coupling.is_connected(1, 2));
        assert!(!coupling.is_connected(0, 2));
    }

    #[test]
    fn test_qasm_precedes_csv() {
        let config = JobConfig::builder().print_qasm(true).build().unwrap();
        let counts: Counts = [("00".to_string(), 6), ("11".to_string(), 4)]
            .into_iter()
            .collect();
        let mut out = Output::buffer();
        let records =
            process_results(&config, "mock", &[bell()], &finished(Some(counts)), &mut out).unwrap();
        assert_eq!(records.len(), 1);

        let text = String::from_utf8(out.contents().unwrap().to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "OPENQASM 2.0;");
        assert_eq!(&lines[lines.len() - 2..], ["00;11;", "6;4;"]);
        assert!(lines[lines.len() - 3].starts_with("mock "));
    }

    #[test]
    fn test_no_counts_no_csv() {
        let config = JobConfig::builder().histogram(true).build().unwrap();
        let mut out = Output::buffer();
        let records = process_results(&config, "mock", &[bell()], &finished(None), &mut out).unwrap();
        assert!(records.is_empty());
        assert!(out.contents().unwrap().is_empty());
    }

    #[test]
    fn test_state_city_needs_statevector() {
        let config = JobConfig::builder().state_city(Some(2)).build().unwrap();
        let counts: Counts = [("00".to_string(), 10)].into_iter().collect();
        let mut out = Output::buffer();
        let err = process_results(&config, "mock", &[bell()], &finished(Some(counts)), &mut out)
            .unwrap_err();
        assert_eq!(err.exit_code(), 100);
    }

    #[tokio::test]
    async fn test_batch_on_local_simulator() {
        let config = JobConfig::builder()
            .local_simulator(Some(LocalSimulator::new(SimulatorKind::Qasm)))
            .shots(200)
            .build()
            .unwrap();
        let backend = Simulator::new(SimulatorKind::Qasm);
        let mut out = Output::buffer();
        let records = run_batch(&config, &backend, vec![bell(), bell()], &mut out)
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        for [description, labels, _] in &records {
            assert!(description.starts_with("qasm_simulator "));
            assert_eq!(labels, "00;11;");
        }
    }

    /// A noiseless 70-qubit line device with an echoed cross-resonance basis.
    fn eagle_line() -> NoiseProfile {
        NoiseProfile {
            reference: "fake_eagle_line".into(),
            basis_gates: ["ecr", "id", "rz", "sx", "x"].map(String::from).to_vec(),
            coupling_map: Some((0..69).map(|q| [q, q + 1]).collect()),
            single_qubit_error: vec![0.0; 70],
            two_qubit_error: (0..69).map(|q| ((q, q + 1), 0.0)).collect(),
            readout_error: vec![0.0; 70],
        }
    }

    #[test]
    fn test_compile_to_ecr_basis() {
        let backend = Simulator::with_options(
            SimulatorKind::Qasm,
            SimulatorOptions::default().with_noise(eagle_line()),
        )
        .unwrap();
        let target = target_for(backend.configuration());
        assert_eq!(target.coupling_map.as_ref().unwrap().num_qubits(), 70);

        let transpiled = compile(&bell(), &target, 1).unwrap();
        let ops = transpiled.circuit.count_ops();
        assert_eq!(ops.get("ecr"), Some(&1));
        assert!(ops.get("cx").is_none());
        assert!(ops.get("h").is_none());
    }

    #[tokio::test]
    async fn test_noisy_sim_of_wide_device() {
        let config = JobConfig::builder()
            .backend("fake_eagle_line")
            .noisy_sim(true)
            .shots(200)
            .build()
            .unwrap();
        let backend = Simulator::with_options(
            SimulatorKind::Qasm,
            SimulatorOptions::default().with_noise(eagle_line()),
        )
        .unwrap();
        let mut out = Output::buffer();
        let records = run_single(&config, &backend, bell(), &mut out).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0][1], "00;11;");
    }

    #[test]
    fn test_statevector_format() {
        let text = format_statevector(&[Complex64::new(1.0, 0.0), Complex64::new(0.0, -0.5)]);
        assert_eq!(text, "[1+0i, 0-0.5i]");
    }
}
