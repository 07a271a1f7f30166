//! Basis translation: rewrite gates into a target's native gate set.

use std::f64::consts::{FRAC_PI_2, PI};

use qisjob_ir::{Circuit, Instruction, InstructionKind, QubitId, StandardGate};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{BasisGates, PropertySet};
use crate::unitary::u_angles;

use StandardGate as G;

/// Equivalent sequence of simpler gates, operands given as local indices.
///
/// Every rule only produces gates with fewer qubits or gates that are
/// themselves closer to `cx` + single-qubit form, so repeated expansion
/// terminates.
fn decompose(gate: &StandardGate) -> Option<Vec<(StandardGate, Vec<usize>)>> {
    let rule = match *gate {
        G::CZ => vec![(G::H, vec![1]), (G::CX, vec![0, 1]), (G::H, vec![1])],
        G::CY => vec![(G::Sdg, vec![1]), (G::CX, vec![0, 1]), (G::S, vec![1])],
        G::CH => vec![
            (G::S, vec![1]),
            (G::H, vec![1]),
            (G::T, vec![1]),
            (G::CX, vec![0, 1]),
            (G::Tdg, vec![1]),
            (G::H, vec![1]),
            (G::Sdg, vec![1]),
        ],
        G::Swap => vec![
            (G::CX, vec![0, 1]),
            (G::CX, vec![1, 0]),
            (G::CX, vec![0, 1]),
        ],
        G::CRx(t) => vec![
            (G::P(FRAC_PI_2), vec![1]),
            (G::CX, vec![0, 1]),
            (G::U(-t / 2.0, 0.0, 0.0), vec![1]),
            (G::CX, vec![0, 1]),
            (G::U(t / 2.0, -FRAC_PI_2, 0.0), vec![1]),
        ],
        G::CRy(t) => vec![
            (G::Ry(t / 2.0), vec![1]),
            (G::CX, vec![0, 1]),
            (G::Ry(-t / 2.0), vec![1]),
            (G::CX, vec![0, 1]),
        ],
        G::CRz(t) => vec![
            (G::Rz(t / 2.0), vec![1]),
            (G::CX, vec![0, 1]),
            (G::Rz(-t / 2.0), vec![1]),
            (G::CX, vec![0, 1]),
        ],
        G::CP(l) => vec![
            (G::P(l / 2.0), vec![0]),
            (G::CX, vec![0, 1]),
            (G::P(-l / 2.0), vec![1]),
            (G::CX, vec![0, 1]),
            (G::P(l / 2.0), vec![1]),
        ],
        G::CU(t, p, l) => vec![
            (G::P((l + p) / 2.0), vec![0]),
            (G::P((l - p) / 2.0), vec![1]),
            (G::CX, vec![0, 1]),
            (G::U(-t / 2.0, 0.0, -(p + l) / 2.0), vec![1]),
            (G::CX, vec![0, 1]),
            (G::U(t / 2.0, p, 0.0), vec![1]),
        ],
        G::RZZ(t) => vec![
            (G::CX, vec![0, 1]),
            (G::Rz(t), vec![1]),
            (G::CX, vec![0, 1]),
        ],
        G::RXX(t) => vec![
            (G::H, vec![0]),
            (G::H, vec![1]),
            (G::CX, vec![0, 1]),
            (G::Rz(t), vec![1]),
            (G::CX, vec![0, 1]),
            (G::H, vec![0]),
            (G::H, vec![1]),
        ],
        G::CCX => vec![
            (G::H, vec![2]),
            (G::CX, vec![1, 2]),
            (G::Tdg, vec![2]),
            (G::CX, vec![0, 2]),
            (G::T, vec![2]),
            (G::CX, vec![1, 2]),
            (G::Tdg, vec![2]),
            (G::CX, vec![0, 2]),
            (G::T, vec![1]),
            (G::T, vec![2]),
            (G::H, vec![2]),
            (G::CX, vec![0, 1]),
            (G::T, vec![0]),
            (G::Tdg, vec![1]),
            (G::CX, vec![0, 1]),
        ],
        G::CSwap => vec![
            (G::CX, vec![2, 1]),
            (G::CCX, vec![0, 1, 2]),
            (G::CX, vec![2, 1]),
        ],
        G::ECR => vec![
            (G::Rz(-FRAC_PI_2), vec![0]),
            (G::Rx(-FRAC_PI_2), vec![1]),
            (G::CX, vec![0, 1]),
            (G::X, vec![0]),
        ],
        _ => return None,
    };
    Some(rule)
}

/// Single-qubit U(θ, φ, λ) in the basis, if the basis has a suitable family.
fn emit_u(
    theta: f64,
    phi: f64,
    lambda: f64,
    basis: &BasisGates,
) -> Option<Vec<StandardGate>> {
    if basis.contains("u") {
        return Some(vec![G::U(theta, phi, lambda)]);
    }
    let z = |a: f64| {
        if basis.contains("rz") {
            Some(G::Rz(a))
        } else if basis.contains("p") {
            Some(G::P(a))
        } else {
            None
        }
    };
    if theta.abs() < 1e-12 {
        return z(phi + lambda).map(|g| vec![g]);
    }
    if basis.contains("sx") {
        return Some(vec![
            z(lambda)?,
            G::SX,
            z(theta + PI)?,
            G::SX,
            z(phi + PI)?,
        ]);
    }
    if basis.contains("ry") {
        return Some(vec![z(lambda)?, G::Ry(theta), z(phi)?]);
    }
    if basis.contains("rx") {
        return Some(vec![z(lambda - FRAC_PI_2)?, G::Rx(theta), z(phi + FRAC_PI_2)?]);
    }
    None
}

pub(crate) fn translate_gate(
    gate: StandardGate,
    qubits: &[QubitId],
    basis: &BasisGates,
    out: &mut Vec<(StandardGate, Vec<QubitId>)>,
) -> CompileResult<()> {
    if basis.contains(gate.name()) {
        out.push((gate, qubits.to_vec()));
        return Ok(());
    }
    let unsupported = || CompileError::GateNotInTarget {
        gate: gate.name().to_string(),
        basis: basis.to_string(),
    };

    if let Some((t, p, l)) = u_angles(&gate) {
        let gates = emit_u(t, p, l, basis).ok_or_else(unsupported)?;
        out.extend(gates.into_iter().map(|g| (g, qubits.to_vec())));
        return Ok(());
    }

    if gate == G::CX && basis.contains("cz") {
        let target = vec![qubits[1]];
        translate_gate(G::H, &target, basis, out)?;
        out.push((G::CZ, qubits.to_vec()));
        return translate_gate(G::H, &target, basis, out);
    }

    // s a; sx b; ecr a, b; x a  equals  cx a, b  up to a global phase
    if gate == G::CX && basis.contains("ecr") {
        translate_gate(G::S, &qubits[..1], basis, out)?;
        translate_gate(G::SX, &qubits[1..], basis, out)?;
        out.push((G::ECR, qubits.to_vec()));
        return translate_gate(G::X, &qubits[..1], basis, out);
    }

    let rule = decompose(&gate).ok_or_else(unsupported)?;
    for (g, local) in rule {
        let operands: Vec<QubitId> = local.iter().map(|&i| qubits[i]).collect();
        translate_gate(g, &operands, basis, out)?;
    }
    Ok(())
}

fn rewrite(
    circuit: &mut Circuit,
    basis: &BasisGates,
    needs_rewrite: impl Fn(&StandardGate) -> bool,
) -> CompileResult<()> {
    if !circuit
        .instructions()
        .iter()
        .filter_map(Instruction::as_gate)
        .any(&needs_rewrite)
    {
        return Ok(());
    }

    let mut rewritten = circuit.empty_like();
    for inst in circuit.instructions() {
        match inst.kind {
            InstructionKind::Gate(gate) if needs_rewrite(&gate) => {
                let mut expanded = Vec::new();
                translate_gate(gate, &inst.qubits, basis, &mut expanded)?;
                for (g, qubits) in expanded {
                    let mut new = Instruction::gate(g, qubits);
                    new.condition.clone_from(&inst.condition);
                    rewritten.push(new)?;
                }
            }
            _ => {
                rewritten.push(inst.clone())?;
            }
        }
    }
    *circuit = rewritten;
    Ok(())
}

/// Decompose gates on three or more qubits into one- and two-qubit gates.
pub struct Unroll3qOrMore;

impl Pass for Unroll3qOrMore {
    fn name(&self) -> &'static str {
        "Unroll3qOrMore"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, _properties: &mut PropertySet) -> CompileResult<()> {
        rewrite(circuit, &BasisGates::universal_two_qubit(), |g| {
            g.num_qubits() > 2
        })
    }
}

/// Rewrite every gate outside the target basis.
pub struct BasisTranslation;

impl Pass for BasisTranslation {
    fn name(&self) -> &'static str {
        "BasisTranslation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let Some(basis) = properties.basis_gates.as_ref() else {
            return Ok(());
        };
        rewrite(circuit, basis, |g| !basis.contains(g.name()))
    }

    fn should_run(&self, _circuit: &Circuit, properties: &PropertySet) -> bool {
        properties.basis_gates.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unitary::Unitary2x2;

    fn translate(circuit: &Circuit, basis: BasisGates) -> CompileResult<Circuit> {
        let mut circuit = circuit.clone();
        let mut props = PropertySet {
            basis_gates: Some(basis),
            ..PropertySet::default()
        };
        BasisTranslation.run(&mut circuit, &mut props)?;
        Ok(circuit)
    }

    fn single_qubit_product(circuit: &Circuit) -> Unitary2x2 {
        circuit
            .instructions()
            .iter()
            .filter_map(Instruction::as_gate)
            .fold(Unitary2x2::identity(), |acc, g| {
                Unitary2x2::of_gate(g).unwrap().then_after(&acc)
            })
    }

    #[test]
    fn test_ibm_basis_output() {
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
        circuit.swap(QubitId(1), QubitId(2)).unwrap();
        circuit.gate(G::CU(0.3, 0.2, 0.1), [QubitId(0), QubitId(2)]).unwrap();

        let translated = translate(&circuit, BasisGates::ibm()).unwrap();
        let basis = BasisGates::ibm();
        for inst in translated.instructions() {
            assert!(basis.contains(inst.name()), "{} not native", inst.name());
        }
        // CCX costs 6 CX, SWAP 3, CU 2
        assert_eq!(translated.count_ops().get("cx"), Some(&11));
    }

    #[test]
    fn test_single_qubit_translation_preserves_unitary() {
        for gate in [G::H, G::Y, G::SXdg, G::Rx(0.7), G::U(1.1, -0.4, 2.5), G::T] {
            let mut circuit = Circuit::with_size("t", 1, 0);
            circuit.gate(gate, [QubitId(0)]).unwrap();
            let translated = translate(&circuit, BasisGates::ibm()).unwrap();
            let expected = Unitary2x2::of_gate(&gate).unwrap();
            assert!(
                single_qubit_product(&translated).equiv(&expected),
                "{gate:?} changed under translation"
            );
        }
    }

    #[test]
    fn test_cz_native_basis() {
        let circuit = Circuit::bell().unwrap();
        let translated = translate(&circuit, BasisGates::new(["rz", "sx", "cz"])).unwrap();
        assert_eq!(translated.count_ops().get("cz"), Some(&1));
        assert_eq!(translated.count_ops().get("cx"), None);
        assert_eq!(translated.count_ops().get("measure"), Some(&2));
    }

    #[test]
    fn test_ecr_native_basis() {
        let basis = BasisGates::new(["ecr", "id", "rz", "sx", "x"]);
        let translated = translate(&Circuit::bell().unwrap(), basis.clone()).unwrap();
        for inst in translated.instructions().iter().filter(|i| i.is_gate()) {
            assert!(basis.contains(inst.name()), "{} not native", inst.name());
        }
        let ops = translated.count_ops();
        assert_eq!(ops.get("ecr"), Some(&1));
        assert_eq!(ops.get("cx"), None);
        assert_eq!(ops.get("measure"), Some(&2));

        let ecr = translated
            .instructions()
            .iter()
            .find(|i| i.name() == "ecr")
            .unwrap();
        assert_eq!(ecr.qubits, vec![QubitId(0), QubitId(1)]);
    }

    #[test]
    fn test_ecr_outside_basis_becomes_cx() {
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.gate(G::ECR, [QubitId(1), QubitId(0)]).unwrap();
        let translated = translate(&circuit, BasisGates::ibm()).unwrap();
        assert_eq!(translated.count_ops().get("ecr"), None);
        let cx: Vec<_> = translated
            .instructions()
            .iter()
            .filter(|i| i.name() == "cx")
            .collect();
        assert_eq!(cx.len(), 1);
        assert_eq!(cx[0].qubits, vec![QubitId(1), QubitId(0)]);
    }

    #[test]
    fn test_rx_rz_basis_preserves_unitary() {
        let basis = BasisGates::new(["rx", "rz", "cz"]);
        for gate in [G::H, G::Y, G::S, G::Ry(0.4), G::U(0.9, 0.3, -1.2)] {
            let mut circuit = Circuit::with_size("t", 1, 0);
            circuit.gate(gate, [QubitId(0)]).unwrap();
            let translated = translate(&circuit, basis.clone()).unwrap();
            for inst in translated.instructions() {
                assert!(basis.contains(inst.name()), "{} not native", inst.name());
            }
            assert!(single_qubit_product(&translated).equiv(&Unitary2x2::of_gate(&gate).unwrap()));
        }
    }

    #[test]
    fn test_untranslatable_gate() {
        let circuit = Circuit::bell().unwrap();
        let err = translate(&circuit, BasisGates::new(["cx"])).unwrap_err();
        assert!(matches!(err, CompileError::GateNotInTarget { ref gate, .. } if gate == "h"));
    }

    #[test]
    fn test_unroll_keeps_two_qubit_gates() {
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
        circuit.cz(QubitId(0), QubitId(1)).unwrap();
        let mut props = PropertySet::new();
        Unroll3qOrMore.run(&mut circuit, &mut props).unwrap();
        assert_eq!(circuit.count_ops().get("ccx"), None);
        assert_eq!(circuit.count_ops().get("cz"), Some(&1));
        assert_eq!(circuit.count_ops().get("h"), Some(&2));
    }
}
