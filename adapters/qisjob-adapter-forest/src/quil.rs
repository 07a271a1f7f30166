//! Quil emission.
//!
//! Measurement of qubit `q` into classical bit `c` becomes
//! `MEASURE q ro[c]`, so the QVM's `ro` rows are already in the circuit's
//! own bit order.

use std::fmt::Write as _;

use qisjob_compile::{transpile, BasisGates, Target};
use qisjob_ir::{Circuit, InstructionKind, StandardGate};

use crate::error::{ForestError, ForestResult};

/// Gates with a direct Quil spelling.
pub const QUIL_BASIS: [&str; 19] = [
    "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "rx", "ry", "rz", "p", "cx", "cz", "swap",
    "cp", "ccx", "cswap",
];

/// Native gates of Rigetti QPUs.
pub const RIGETTI_BASIS: [&str; 3] = ["rx", "rz", "cz"];

fn gate_text(gate: &StandardGate) -> Option<String> {
    use StandardGate as G;
    let text = match *gate {
        G::I => "I".into(),
        G::X => "X".into(),
        G::Y => "Y".into(),
        G::Z => "Z".into(),
        G::H => "H".into(),
        G::S => "S".into(),
        G::Sdg => "DAGGER S".into(),
        G::T => "T".into(),
        G::Tdg => "DAGGER T".into(),
        G::Rx(theta) => format!("RX({theta})"),
        G::Ry(theta) => format!("RY({theta})"),
        G::Rz(theta) => format!("RZ({theta})"),
        G::P(lambda) => format!("PHASE({lambda})"),
        G::CX => "CNOT".into(),
        G::CZ => "CZ".into(),
        G::Swap => "SWAP".into(),
        G::CP(lambda) => format!("CPHASE({lambda})"),
        G::CCX => "CCNOT".into(),
        G::CSwap => "CSWAP".into(),
        _ => return None,
    };
    Some(text)
}

/// The target used for plain QVM runs: the Quil gate set, all-to-all.
pub fn quil_target() -> Target {
    Target::new(BasisGates::new(QUIL_BASIS))
}

/// Rewrite `circuit` into the Quil gate set and print it.
pub fn to_quil(circuit: &Circuit) -> ForestResult<String> {
    to_quil_for(circuit, &quil_target(), 0)
}

/// Compile `circuit` for `target` at `level` and print it.
///
/// Every basis gate of `target` must have a Quil spelling.
pub fn to_quil_for(circuit: &Circuit, target: &Target, level: u8) -> ForestResult<String> {
    if let Some(inst) = circuit.instructions().iter().find(|i| i.is_conditional()) {
        return Err(ForestError::Conversion(format!(
            "classically conditioned '{}'",
            inst.name()
        )));
    }
    let native = transpile(circuit, target, level)
        .map_err(|e| ForestError::Conversion(e.to_string()))?
        .circuit;

    let mut out = String::new();
    if native.num_clbits() > 0 {
        let _ = writeln!(out, "DECLARE ro BIT[{}]", native.num_clbits());
    }
    for inst in native.instructions() {
        let qubits: Vec<String> = inst.qubits.iter().map(|q| q.0.to_string()).collect();
        match &inst.kind {
            InstructionKind::Gate(gate) => {
                let text = gate_text(gate).ok_or_else(|| {
                    ForestError::Conversion(format!("gate '{}' has no Quil form", gate.name()))
                })?;
                let _ = writeln!(out, "{text} {}", qubits.join(" "));
            }
            InstructionKind::Measure => {
                for (q, c) in inst.qubits.iter().zip(&inst.clbits) {
                    let _ = writeln!(out, "MEASURE {} ro[{}]", q.0, c.0);
                }
            }
            InstructionKind::Reset => {
                for q in &qubits {
                    let _ = writeln!(out, "RESET {q}");
                }
            }
            InstructionKind::Barrier => {}
        }
    }
    Ok(out)
}
