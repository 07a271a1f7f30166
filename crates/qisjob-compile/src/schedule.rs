//! As-soon-as-possible scheduling of a compiled circuit.

use std::fmt;

use qisjob_ir::{Circuit, ClbitId, QubitId};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Instruction durations in nanoseconds.
#[derive(Debug, Clone)]
pub struct InstructionDurations {
    by_name: FxHashMap<String, f64>,
    single_qubit: f64,
    two_qubit: f64,
}

impl InstructionDurations {
    /// Durations typical of superconducting transmon devices.
    pub fn transmon() -> Self {
        let mut by_name = FxHashMap::default();
        for virtual_z in ["rz", "p", "id"] {
            by_name.insert(virtual_z.to_string(), 0.0);
        }
        by_name.insert("measure".into(), 4000.0);
        by_name.insert("reset".into(), 840.0);
        by_name.insert("barrier".into(), 0.0);
        Self {
            by_name,
            single_qubit: 35.56,
            two_qubit: 355.56,
        }
    }

    /// Override the duration of one instruction name.
    #[must_use]
    pub fn with_duration(mut self, name: impl Into<String>, nanos: f64) -> Self {
        self.by_name.insert(name.into(), nanos);
        self
    }

    /// Duration of an instruction with the given name and arity.
    pub fn get(&self, name: &str, num_qubits: usize) -> f64 {
        if let Some(&d) = self.by_name.get(name) {
            return d;
        }
        if num_qubits >= 2 {
            self.two_qubit * (num_qubits - 1) as f64
        } else {
            self.single_qubit
        }
    }
}

impl Default for InstructionDurations {
    fn default() -> Self {
        Self::transmon()
    }
}

/// One instruction placed in time.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledInstruction {
    pub start: f64,
    pub duration: f64,
    pub name: &'static str,
    pub qubits: Vec<QubitId>,
    pub clbits: Vec<ClbitId>,
}

/// An ASAP schedule.
#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    pub entries: Vec<ScheduledInstruction>,
    /// Time at which the last instruction finishes.
    pub duration: f64,
}

/// Start every instruction as soon as its qubits, classical bits and
/// condition register are free. Barriers synchronize their qubits.
pub fn schedule_asap(circuit: &Circuit, durations: &InstructionDurations) -> Schedule {
    let mut qubit_free = vec![0.0_f64; circuit.num_qubits()];
    let mut clbit_free = vec![0.0_f64; circuit.num_clbits()];
    let mut entries = Vec::with_capacity(circuit.instructions().len());
    let mut total = 0.0_f64;

    for inst in circuit.instructions() {
        let cond_bits: Vec<usize> = inst
            .condition
            .as_ref()
            .and_then(|c| circuit.condition_bits(c))
            .map(|bits| bits.into_iter().map(|(b, _)| b).collect())
            .unwrap_or_default();

        let start = inst
            .qubits
            .iter()
            .map(|q| qubit_free[q.index()])
            .chain(inst.clbits.iter().map(|c| clbit_free[c.index()]))
            .chain(cond_bits.iter().map(|&b| clbit_free[b]))
            .fold(0.0, f64::max);
        let duration = durations.get(inst.name(), inst.qubits.len());
        let end = start + duration;

        for q in &inst.qubits {
            qubit_free[q.index()] = end;
        }
        for c in &inst.clbits {
            clbit_free[c.index()] = end;
        }
        total = total.max(end);

        if !inst.is_barrier() {
            entries.push(ScheduledInstruction {
                start,
                duration,
                name: inst.name(),
                qubits: inst.qubits.clone(),
                clbits: inst.clbits.clone(),
            });
        }
    }

    Schedule {
        entries,
        duration: total,
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>10}  instruction", "start (ns)", "dur (ns)")?;
        for e in &self.entries {
            let qubits: Vec<String> = e.qubits.iter().map(ToString::to_string).collect();
            write!(
                f,
                "{:>12.2} {:>10.2}  {} {}",
                e.start,
                e.duration,
                e.name,
                qubits.join(",")
            )?;
            if !e.clbits.is_empty() {
                let clbits: Vec<String> = e.clbits.iter().map(ToString::to_string).collect();
                write!(f, " -> {}", clbits.join(","))?;
            }
            writeln!(f)?;
        }
        write!(f, "total duration: {:.2} ns", self.duration)
    }
}
