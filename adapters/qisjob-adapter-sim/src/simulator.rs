//! Local simulator backend.

use std::borrow::Cow;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use num_complex::Complex64;
use qisjob_hal::{
    bit_label, check_width, Backend, BackendConfiguration, BackendProperties, BackendStatus,
    Counts, ExperimentResult, HalError, HalResult, JobId, JobRecord, JobResult, JobStatus,
    NoiseProfile, RunOptions,
};
use qisjob_ir::{Circuit, InstructionKind, QubitId, StandardGate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::options::{Precision, SimulatorKind, SimulatorOptions};
use crate::statevector::Statevector;

/// A finished local job.
struct SimJob {
    record: JobRecord,
    result: JobResult,
}

/// A noise profile addressed by simulated qubit.
struct DeviceNoise<'a> {
    profile: &'a NoiseProfile,
    /// Device qubit behind each simulated qubit; empty means the same index.
    physical: &'a [QubitId],
}

impl DeviceNoise<'_> {
    fn device_qubit(&self, qubit: usize) -> u32 {
        self.physical.get(qubit).map_or(qubit as u32, |q| q.0)
    }

    fn single_qubit(&self, qubit: usize) -> f64 {
        self.profile.single_qubit(self.device_qubit(qubit))
    }

    fn two_qubit(&self, a: usize, b: usize) -> f64 {
        self.profile
            .two_qubit(self.device_qubit(a), self.device_qubit(b))
    }

    fn readout(&self, qubit: usize) -> f64 {
        self.profile.readout(self.device_qubit(qubit))
    }
}

/// Outcome of simulating one circuit for all shots.
struct Sampled {
    counts: Option<Counts>,
    memory: Option<Vec<String>>,
    final_state: Statevector,
}

/// Statevector simulator running in-process.
///
/// Jobs complete inside `submit`; the handle keeps their records and
/// results for later retrieval.
pub struct LocalSimulator {
    kind: SimulatorKind,
    options: SimulatorOptions,
    configuration: BackendConfiguration,
    jobs: Arc<Mutex<FxHashMap<JobId, SimJob>>>,
}

impl LocalSimulator {
    /// A noiseless simulator of the given kind.
    pub fn new(kind: SimulatorKind) -> Self {
        Self {
            kind,
            options: SimulatorOptions::default(),
            configuration: Self::base_configuration(kind),
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// A simulator with explicit options.
    ///
    /// With a noise profile the simulator takes on the reference device's
    /// basis gates and coupling map. Circuits compiled to the whole device
    /// are simulated on the qubits they act on, of which there may be at
    /// most [`SimulatorKind::max_qubits`].
    pub fn with_options(kind: SimulatorKind, options: SimulatorOptions) -> HalResult<Self> {
        options.validate(kind)?;
        let mut configuration = Self::base_configuration(kind);
        if let Some(noise) = &options.noise {
            let width = u32::try_from(noise.single_qubit_error.len()).unwrap_or(u32::MAX);
            configuration.n_qubits = width.min(kind.max_qubits());
            configuration.basis_gates = noise.basis_gates.clone();
            configuration.coupling_map = noise.coupling_map.clone();
            configuration.description = Some(format!("noisy simulation of {}", noise.reference));
        }
        Ok(Self {
            kind,
            options,
            configuration,
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
        })
    }

    fn base_configuration(kind: SimulatorKind) -> BackendConfiguration {
        let mut configuration = BackendConfiguration::new(kind.name(), kind.max_qubits())
            .simulator(true)
            .with_basis_gates([
                "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "sxdg", "rx", "ry", "rz",
                "p", "u", "cx", "cy", "cz", "ch", "swap", "crx", "cry", "crz", "cp", "cu", "rxx",
                "rzz", "ecr", "ccx", "cswap",
            ])
            .with_max_shots(1_000_000);
        configuration.backend_version = env!("CARGO_PKG_VERSION").into();
        configuration.description = Some("local statevector simulator".into());
        configuration
    }

    /// The simulator kind.
    pub fn kind(&self) -> SimulatorKind {
        self.kind
    }

    /// The options in effect.
    pub fn options(&self) -> &SimulatorOptions {
        &self.options
    }

    /// The circuits as simulated, each with the device qubits behind its
    /// simulated ones.
    ///
    /// Noisy runs get circuits compiled to the whole reference device, so
    /// their idle qubits are dropped and the width check applies to what is
    /// left.
    fn experiments<'c>(
        &self,
        circuits: &'c [Circuit],
    ) -> HalResult<Vec<(Cow<'c, Circuit>, Vec<QubitId>)>> {
        let Some(noise) = &self.options.noise else {
            check_width(circuits, &self.configuration)?;
            return Ok(circuits
                .iter()
                .map(|c| (Cow::Borrowed(c), Vec::new()))
                .collect());
        };

        let mut experiments = Vec::with_capacity(circuits.len());
        for circuit in circuits {
            let (active, physical) = circuit.without_idle_qubits();
            if active.num_qubits() > self.configuration.n_qubits as usize {
                return Err(HalError::CircuitTooLarge(format!(
                    "{} acts on {} qubits of {}, {} simulates at most {}",
                    circuit.name(),
                    active.num_qubits(),
                    noise.reference,
                    self.name(),
                    self.configuration.n_qubits
                )));
            }
            debug!(
                circuit = circuit.name(),
                width = circuit.num_qubits(),
                active = active.num_qubits(),
                "dropped idle qubits"
            );
            experiments.push((Cow::Owned(active), physical));
        }
        Ok(experiments)
    }

    /// Simulate one circuit.
    #[instrument(skip_all, fields(circuit = circuit.name(), shots = options.shots))]
    fn run_experiment(
        &self,
        circuit: &Circuit,
        physical: &[QubitId],
        options: &RunOptions,
        rng: &mut StdRng,
    ) -> HalResult<ExperimentResult> {
        let start = Instant::now();
        let mut experiment = ExperimentResult::new(circuit.name(), options.shots);
        experiment.metadata.insert("method".into(), json!(self.options.method.name()));
        experiment
            .metadata
            .insert("precision".into(), json!(self.options.precision.name()));

        if self.kind == SimulatorKind::Unitary {
            let unitary = unitary_of(circuit)?;
            experiment.unitary = Some(
                unitary
                    .into_iter()
                    .map(|row| self.round(row))
                    .collect(),
            );
        } else {
            let sampled = self.sample(circuit, physical, options, rng);
            experiment.counts = sampled.counts;
            experiment.memory = sampled.memory;
            if self.kind == SimulatorKind::Statevector {
                experiment.statevector = Some(self.round(sampled.final_state.into_amplitudes()));
            }
        }

        if let Some(noise) = &self.options.noise {
            experiment
                .metadata
                .insert("noise_reference".into(), json!(noise.reference));
        }
        debug!(elapsed = ?start.elapsed(), "simulation finished");
        Ok(experiment)
    }

    fn sample(
        &self,
        circuit: &Circuit,
        physical: &[QubitId],
        options: &RunOptions,
        rng: &mut StdRng,
    ) -> Sampled {
        let measured = circuit.has_measurements();
        let noise = self
            .options
            .noise
            .as_ref()
            .map(|profile| DeviceNoise { profile, physical });
        let mut counts = Counts::new();
        let mut memory = Vec::new();

        if noise.is_none() && circuit.has_terminal_measurements_only() {
            let final_state = evolve(circuit);
            if measured {
                let measures = measure_map(circuit);
                for _ in 0..options.shots {
                    let index = final_state.sample(rng);
                    let mut bits = vec![false; circuit.num_clbits()];
                    for &(qubit, clbit) in &measures {
                        bits[clbit] = (index >> qubit) & 1 == 1;
                    }
                    record(circuit, &bits, &mut counts, &mut memory, options.memory);
                }
            }
            return Sampled {
                counts: measured.then_some(counts),
                memory: (measured && options.memory).then_some(memory),
                final_state,
            };
        }

        debug!("running per-shot trajectories");
        let mut first_state = None;
        for _ in 0..options.shots.max(1) {
            let (state, bits) = trajectory(circuit, noise.as_ref(), rng);
            if measured {
                record(circuit, &bits, &mut counts, &mut memory, options.memory);
            }
            first_state.get_or_insert(state);
        }
        Sampled {
            counts: measured.then_some(counts),
            memory: (measured && options.memory).then_some(memory),
            final_state: first_state.unwrap_or_else(|| Statevector::new(circuit.num_qubits())),
        }
    }

    fn round(&self, amplitudes: Vec<Complex64>) -> Vec<Complex64> {
        match self.options.precision {
            Precision::Double => amplitudes,
            Precision::Single => amplitudes
                .into_iter()
                .map(|a| Complex64::new(f64::from(a.re as f32), f64::from(a.im as f32)))
                .collect(),
        }
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, FxHashMap<JobId, SimJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn record(circuit: &Circuit, bits: &[bool], counts: &mut Counts, memory: &mut Vec<String>, keep: bool) {
    let label = bit_label(circuit, bits);
    if keep {
        memory.push(label.clone());
    }
    counts.add(label, 1);
}

/// (qubit, clbit) of every measurement, later ones overriding earlier.
fn measure_map(circuit: &Circuit) -> Vec<(usize, usize)> {
    circuit
        .instructions()
        .iter()
        .filter(|inst| inst.is_measure())
        .flat_map(|inst| {
            inst.qubits
                .iter()
                .zip(&inst.clbits)
                .map(|(q, c)| (q.index(), c.index()))
        })
        .collect()
}

/// Apply every gate, skipping measurements and barriers.
fn evolve(circuit: &Circuit) -> Statevector {
    let mut state = Statevector::new(circuit.num_qubits());
    for inst in circuit.instructions() {
        if let Some(gate) = inst.as_gate() {
            let qubits: Vec<usize> = inst.qubits.iter().map(|q| q.index()).collect();
            state.apply_gate(gate, &qubits);
        }
    }
    state
}

/// One shot with mid-circuit measurement, resets, conditions and noise.
fn trajectory<R: Rng>(
    circuit: &Circuit,
    noise: Option<&DeviceNoise<'_>>,
    rng: &mut R,
) -> (Statevector, Vec<bool>) {
    let mut state = Statevector::new(circuit.num_qubits());
    let mut bits = vec![false; circuit.num_clbits()];

    for inst in circuit.instructions() {
        if let Some(condition) = &inst.condition {
            let satisfied = circuit
                .condition_bits(condition)
                .is_some_and(|expected| expected.iter().all(|&(c, v)| bits[c] == v));
            if !satisfied {
                continue;
            }
        }
        let qubits: Vec<usize> = inst.qubits.iter().map(|q| q.index()).collect();
        match inst.kind {
            InstructionKind::Gate(gate) => {
                state.apply_gate(&gate, &qubits);
                if let Some(noise) = noise {
                    depolarize(&mut state, &gate, &qubits, noise, rng);
                }
            }
            InstructionKind::Measure => {
                for (q, c) in qubits.iter().zip(&inst.clbits) {
                    let mut outcome = state.measure(*q, rng);
                    if let Some(noise) = noise {
                        if rng.gen_bool(noise.readout(*q).clamp(0.0, 1.0)) {
                            outcome = !outcome;
                        }
                    }
                    bits[c.index()] = outcome;
                }
            }
            InstructionKind::Reset => {
                for q in &qubits {
                    state.reset(*q, rng);
                }
            }
            InstructionKind::Barrier => {}
        }
    }
    (state, bits)
}

/// With the gate's error probability, hit each of its qubits with a random
/// Pauli.
fn depolarize<R: Rng>(
    state: &mut Statevector,
    gate: &StandardGate,
    qubits: &[usize],
    noise: &DeviceNoise<'_>,
    rng: &mut R,
) {
    let p = match qubits {
        [q] => noise.single_qubit(*q),
        [a, b] => noise.two_qubit(*a, *b),
        _ => qubits
            .iter()
            .map(|q| noise.single_qubit(*q))
            .fold(0.0, f64::max),
    };
    // virtual z rotations are error free on hardware
    if matches!(gate, StandardGate::Rz(_) | StandardGate::P(_) | StandardGate::I) {
        return;
    }
    if !rng.gen_bool(p.clamp(0.0, 1.0)) {
        return;
    }
    for &q in qubits {
        let pauli = match rng.gen_range(0..3) {
            0 => StandardGate::X,
            1 => StandardGate::Y,
            _ => StandardGate::Z,
        };
        state.apply_gate(&pauli, &[q]);
    }
}

/// Row-major unitary of a measurement-free circuit.
fn unitary_of(circuit: &Circuit) -> HalResult<Vec<Vec<Complex64>>> {
    if let Some(inst) = circuit
        .instructions()
        .iter()
        .find(|inst| !(inst.is_gate() || inst.is_barrier()) || inst.is_conditional())
    {
        return Err(HalError::InvalidCircuit(format!(
            "unitary_simulator cannot run '{}' in {}",
            inst.name(),
            circuit.name()
        )));
    }
    let dim = 1usize << circuit.num_qubits();
    let mut unitary = vec![vec![Complex64::new(0.0, 0.0); dim]; dim];
    for col in 0..dim {
        let mut state = Statevector::basis_state(circuit.num_qubits(), col);
        for inst in circuit.instructions() {
            if let Some(gate) = inst.as_gate() {
                let qubits: Vec<usize> = inst.qubits.iter().map(|q| q.index()).collect();
                state.apply_gate(gate, &qubits);
            }
        }
        for (row, amp) in state.amplitudes().iter().enumerate() {
            unitary[row][col] = *amp;
        }
    }
    Ok(unitary)
}

#[async_trait]
impl Backend for LocalSimulator {
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
        Ok(BackendStatus {
            backend_version: self.configuration.backend_version.clone(),
            ..BackendStatus::active(self.name())
        })
    }

    #[instrument(skip(self, circuits, options), fields(backend = self.name(), circuits = circuits.len()))]
    async fn submit(&self, circuits: &[Circuit], options: &RunOptions) -> HalResult<JobId> {
        options.validate(&self.configuration)?;
        self.options.validate(self.kind)?;
        let experiments = self.experiments(circuits)?;

        let job_id = JobId::new(Uuid::new_v4().to_string());
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let results = experiments
            .iter()
            .map(|(circuit, physical)| self.run_experiment(circuit, physical, options, &mut rng))
            .collect::<HalResult<Vec<_>>>()?;

        let record =
            JobRecord::new(job_id.clone(), self.name(), options.shots).with_status(JobStatus::Completed);
        let result = JobResult::new(self.name(), job_id.clone(), results);
        self.lock_jobs().insert(job_id.clone(), SimJob { record, result });

        info!(job = %job_id, "local job completed");
        Ok(job_id)
    }

    async fn job_status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        self.lock_jobs()
            .get(job_id)
            .map(|job| job.record.status.clone())
            .ok_or_else(|| HalError::JobNotFound(job_id.to_string()))
    }

    async fn result(&self, job_id: &JobId) -> HalResult<JobResult> {
        self.lock_jobs()
            .get(job_id)
            .map(|job| job.result.clone())
            .ok_or_else(|| HalError::JobNotFound(job_id.to_string()))
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
