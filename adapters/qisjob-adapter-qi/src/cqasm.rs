//! cQASM 1.0 emission.

use std::fmt::Write as _;

use qisjob_compile::{transpile, BasisGates, Target};
use qisjob_ir::{Circuit, InstructionKind, StandardGate};

use crate::error::{QiError, QiResult};

/// Gates with a direct cQASM spelling.
pub const QI_BASIS: [&str; 16] = [
    "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "rx", "ry", "rz", "cx", "cz", "swap", "ccx",
];

fn gate_name(gate: &StandardGate) -> Option<&'static str> {
    Some(match gate {
        StandardGate::I => "I",
        StandardGate::X => "X",
        StandardGate::Y => "Y",
        StandardGate::Z => "Z",
        StandardGate::H => "H",
        StandardGate::S => "S",
        StandardGate::Sdg => "Sdag",
        StandardGate::T => "T",
        StandardGate::Tdg => "Tdag",
        StandardGate::Rx(_) => "Rx",
        StandardGate::Ry(_) => "Ry",
        StandardGate::Rz(_) => "Rz",
        StandardGate::CX => "CNOT",
        StandardGate::CZ => "CZ",
        StandardGate::Swap => "SWAP",
        StandardGate::CCX => "Toffoli",
        _ => return None,
    })
}

/// Rewrite `circuit` into the cQASM gate set and print it.
///
/// Measurement of qubit `i` lands in bit `b[i]`; callers map that back to
/// the circuit's own classical bits.
pub fn to_cqasm(circuit: &Circuit) -> QiResult<String> {
    if let Some(inst) = circuit.instructions().iter().find(|i| i.is_conditional()) {
        return Err(QiError::Conversion(format!(
            "classically conditioned '{}'",
            inst.name()
        )));
    }
    let target = Target::new(BasisGates::new(QI_BASIS));
    let native = transpile(circuit, &target, 0)
        .map_err(|e| QiError::Conversion(e.to_string()))?
        .circuit;

    let mut out = String::new();
    let _ = writeln!(out, "version 1.0");
    let _ = writeln!(out);
    let _ = writeln!(out, "qubits {}", native.num_qubits().max(1));
    let _ = writeln!(out);
    for inst in native.instructions() {
        let qubits: Vec<String> = inst.qubits.iter().map(|q| format!("q[{}]", q.0)).collect();
        match &inst.kind {
            InstructionKind::Gate(gate) => {
                let name = gate_name(gate).ok_or_else(|| {
                    QiError::Conversion(format!("gate '{}' has no cQASM form", gate.name()))
                })?;
                let mut line = format!("{name} {}", qubits.join(", "));
                for param in gate.params() {
                    let _ = write!(line, ", {param}");
                }
                let _ = writeln!(out, "{line}");
            }
            InstructionKind::Measure => {
                for q in &qubits {
                    let _ = writeln!(out, "measure {q}");
                }
            }
            InstructionKind::Reset => {
                for q in &qubits {
                    let _ = writeln!(out, "prep_z {q}");
                }
            }
            InstructionKind::Barrier => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use qisjob_ir::{ClassicalCondition, Instruction, QubitId};

    use super::*;

    #[test]
    fn test_bell_cqasm() {
        let text = to_cqasm(&Circuit::bell().unwrap()).unwrap();
        assert!(text.starts_with("version 1.0\n"));
        assert!(text.contains("qubits 2"));
        assert!(text.contains("H q[0]"));
        assert!(text.contains("CNOT q[0], q[1]"));
        assert!(text.contains("measure q[1]"));
    }

    #[test]
    fn test_rotation_parameters() {
        let mut circuit = Circuit::with_size("rot", 1, 0);
        circuit.rx(0.5, QubitId(0)).unwrap();
        let text = to_cqasm(&circuit).unwrap();
        assert!(text.contains("Rx q[0], 0.5"));
    }

    #[test]
    fn test_non_native_gates_are_translated() {
        let mut circuit = Circuit::with_size("sx", 1, 0);
        circuit.sx(QubitId(0)).unwrap();
        let text = to_cqasm(&circuit).unwrap();
        assert!(!text.contains("SX"));
        assert!(text.lines().skip(4).count() >= 1);
    }

    #[test]
    fn test_conditions_rejected() {
        let mut circuit = Circuit::with_size("cond", 1, 1);
        circuit
            .push(
                Instruction::single_qubit_gate(StandardGate::X, QubitId(0))
                    .with_condition(ClassicalCondition::new("c", 1)),
            )
            .unwrap();
        assert!(matches!(to_cqasm(&circuit), Err(QiError::Conversion(_))));
    }
}
