//! Peephole optimizations.

use qisjob_ir::{Circuit, Instruction, QubitId, StandardGate};
use tracing::debug;

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::passes::translation::translate_gate;
use crate::property::{BasisGates, PropertySet};
use crate::unitary::Unitary2x2;

fn is_plain_gate(inst: &Instruction) -> bool {
    inst.is_gate() && !inst.is_conditional()
}

/// Remove adjacent gate pairs that multiply to the identity, such as
/// `h; h`, `cx a,b; cx a,b` or `t; tdg`.
///
/// Two gates are adjacent when no other instruction touches any of their
/// qubits in between. Conditional gates are never cancelled.
pub struct CancelInversePairs;

impl CancelInversePairs {
    fn cancel(circuit: &Circuit) -> Vec<bool> {
        let instructions = circuit.instructions();
        let mut keep = vec![true; instructions.len()];
        // Indices of surviving instructions per qubit, most recent last
        let mut wires: Vec<Vec<usize>> = vec![vec![]; circuit.num_qubits()];

        for (idx, inst) in instructions.iter().enumerate() {
            let partner = inst
                .qubits
                .first()
                .and_then(|q| wires[q.index()].last().copied())
                .filter(|&prev| {
                    let before = &instructions[prev];
                    is_plain_gate(inst)
                        && is_plain_gate(before)
                        && before.qubits == inst.qubits
                        && inst
                            .qubits
                            .iter()
                            .all(|q| wires[q.index()].last() == Some(&prev))
                        && match (before.as_gate(), inst.as_gate()) {
                            (Some(a), Some(b)) => a.inverse() == *b,
                            _ => false,
                        }
                });

            if let Some(prev) = partner {
                keep[prev] = false;
                keep[idx] = false;
                for q in &inst.qubits {
                    wires[q.index()].pop();
                }
            } else {
                for q in &inst.qubits {
                    wires[q.index()].push(idx);
                }
            }
        }
        keep
    }
}

impl Pass for CancelInversePairs {
    fn name(&self) -> &'static str {
        "CancelInversePairs"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, _properties: &mut PropertySet) -> CompileResult<()> {
        let keep = Self::cancel(circuit);
        let removed = keep.iter().filter(|k| !**k).count();
        if removed == 0 {
            return Ok(());
        }
        let mut optimized = circuit.empty_like();
        for (inst, keep) in circuit.instructions().iter().zip(keep) {
            if keep {
                optimized.push(inst.clone())?;
            }
        }
        debug!(removed, "cancelled inverse gate pairs");
        *circuit = optimized;
        Ok(())
    }
}

/// Collapse runs of single-qubit gates into one U(θ, φ, λ), re-expressed in
/// the target basis.
///
/// A run is replaced only when the result is shorter; runs multiplying to the
/// identity are dropped.
pub struct Optimize1qGates;

impl Optimize1qGates {
    fn resynthesize(
        circuit: &Circuit,
        run: &[usize],
        qubit: QubitId,
        basis: &BasisGates,
        replacements: &mut [Option<Vec<Instruction>>],
    ) {
        if run.len() < 2 {
            return;
        }
        let instructions = circuit.instructions();
        let mut product = Unitary2x2::identity();
        for &idx in run {
            let Some(matrix) = instructions[idx].as_gate().and_then(Unitary2x2::of_gate) else {
                return;
            };
            product = matrix.then_after(&product);
        }

        let replacement = if product.is_identity() {
            vec![]
        } else {
            let (theta, phi, lambda) = product.to_u_angles();
            let mut synthesized = Vec::new();
            let gate = StandardGate::U(theta, phi, lambda);
            if translate_gate(gate, &[qubit], basis, &mut synthesized).is_err() {
                return;
            }
            synthesized
                .into_iter()
                .map(|(g, qubits)| Instruction::gate(g, qubits))
                .collect()
        };
        if replacement.len() >= run.len() {
            return;
        }

        let Some((&last, rest)) = run.split_last() else {
            return;
        };
        for &idx in rest {
            replacements[idx] = Some(vec![]);
        }
        replacements[last] = Some(replacement);
    }
}

impl Pass for Optimize1qGates {
    fn name(&self) -> &'static str {
        "Optimize1qGates"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let basis = properties
            .basis_gates
            .clone()
            .unwrap_or_else(BasisGates::universal);
        let instructions = circuit.instructions();
        let mut replacements: Vec<Option<Vec<Instruction>>> = vec![None; instructions.len()];
        let mut runs: Vec<Vec<usize>> = vec![vec![]; circuit.num_qubits()];

        for (idx, inst) in instructions.iter().enumerate() {
            if is_plain_gate(inst) && inst.qubits.len() == 1 {
                runs[inst.qubits[0].index()].push(idx);
                continue;
            }
            for &q in &inst.qubits {
                let run = std::mem::take(&mut runs[q.index()]);
                Self::resynthesize(circuit, &run, q, &basis, &mut replacements);
            }
        }
        for (q, run) in runs.iter().enumerate() {
            Self::resynthesize(circuit, run, QubitId(q as u32), &basis, &mut replacements);
        }

        if replacements.iter().all(Option::is_none) {
            return Ok(());
        }
        let mut optimized = circuit.empty_like();
        for (inst, replacement) in instructions.iter().zip(replacements) {
            match replacement {
                Some(new) => {
                    for r in new {
                        optimized.push(r)?;
                    }
                }
                None => {
                    optimized.push(inst.clone())?;
                }
            }
        }
        debug!(
            before = instructions.len(),
            after = optimized.instructions().len(),
            "merged single-qubit runs"
        );
        *circuit = optimized;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use qisjob_ir::{ClassicalCondition, ClbitId};

    use super::*;

    fn run_pass(pass: &dyn Pass, circuit: &mut Circuit, basis: Option<BasisGates>) {
        let mut props = PropertySet {
            basis_gates: basis,
            ..PropertySet::default()
        };
        pass.run(circuit, &mut props).unwrap();
    }

    #[test]
    fn test_cancel_adjacent_pairs() {
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.t(QubitId(1)).unwrap();
        circuit.gate(StandardGate::Tdg, [QubitId(1)]).unwrap();

        run_pass(&CancelInversePairs, &mut circuit, None);
        assert!(circuit.instructions().is_empty());
    }

    #[test]
    fn test_cancellation_cascades() {
        // h x x h collapses completely
        let mut circuit = Circuit::with_size("t", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.x(QubitId(0)).unwrap();
        circuit.x(QubitId(0)).unwrap();
        circuit.h(QubitId(0)).unwrap();
        run_pass(&CancelInversePairs, &mut circuit, None);
        assert!(circuit.instructions().is_empty());
    }

    #[test]
    fn test_no_cancellation_across_measure_or_condition() {
        let mut circuit = Circuit::with_size("t", 2, 2);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.measure(QubitId(1), ClbitId(1)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.x(QubitId(0)).unwrap();
        circuit
            .push(
                Instruction::single_qubit_gate(StandardGate::X, QubitId(0))
                    .with_condition(ClassicalCondition::new("c", 1)),
            )
            .unwrap();
        // reversed operands are a different gate
        circuit.cx(QubitId(1), QubitId(0)).unwrap();

        let before = circuit.instructions().len();
        run_pass(&CancelInversePairs, &mut circuit, None);
        assert_eq!(circuit.instructions().len(), before);
    }

    #[test]
    fn test_merge_single_qubit_run() {
        let mut circuit = Circuit::with_size("t", 2, 2);
        circuit.rz(0.3, QubitId(0)).unwrap();
        circuit.rz(0.4, QubitId(0)).unwrap();
        circuit.rz(0.5, QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.measure_all().unwrap();

        run_pass(&Optimize1qGates, &mut circuit, Some(BasisGates::ibm()));
        let ops = circuit.count_ops();
        assert_eq!(ops.get("rz"), Some(&1));
        assert_eq!(ops.get("cx"), Some(&1));
        match circuit.instructions()[0].as_gate() {
            Some(StandardGate::Rz(angle)) => assert!((angle - 1.2).abs() < 1e-9),
            other => panic!("expected rz, got {other:?}"),
        }
        assert_eq!(ops.get("measure"), Some(&2));
    }

    #[test]
    fn test_identity_run_removed() {
        let mut circuit = Circuit::with_size("t", 1, 0);
        circuit.s(QubitId(0)).unwrap();
        circuit.s(QubitId(0)).unwrap();
        circuit.z(QubitId(0)).unwrap();
        run_pass(&Optimize1qGates, &mut circuit, Some(BasisGates::universal()));
        assert!(circuit.instructions().is_empty());
    }

    #[test]
    fn test_run_not_lengthened() {
        // sx; rz resynthesizes to five IBM gates
        let mut circuit = Circuit::with_size("t", 1, 0);
        circuit.sx(QubitId(0)).unwrap();
        circuit.rz(0.2, QubitId(0)).unwrap();
        run_pass(&Optimize1qGates, &mut circuit, Some(BasisGates::ibm()));
        assert_eq!(circuit.instructions().len(), 2);
    }
}
