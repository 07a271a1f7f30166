//! Transpiler pipelines must never move or merge gates across measurements,
//! and must keep single-qubit programs unitarily equivalent.

use std::f64::consts::PI;

use proptest::prelude::*;
use qisjob_compile::unitary::Unitary2x2;
use qisjob_compile::{transpile, BasisGates, CouplingMap, Target};
use qisjob_ir::{Circuit, ClbitId, Instruction, QubitId, StandardGate};

fn ops_on_qubit(circuit: &Circuit, qubit: QubitId) -> Vec<&'static str> {
    circuit
        .instructions()
        .iter()
        .filter(|inst| inst.qubits.contains(&qubit))
        .map(Instruction::name)
        .collect()
}

fn product(circuit: &Circuit) -> Unitary2x2 {
    circuit
        .instructions()
        .iter()
        .filter_map(Instruction::as_gate)
        .fold(Unitary2x2::identity(), |acc, g| {
            Unitary2x2::of_gate(g).unwrap().then_after(&acc)
        })
}

// ============================================================================
// Measurement boundaries
// ============================================================================

#[test]
fn test_h_measure_h_survives_every_level() {
    let mut circuit = Circuit::with_size("hmh", 1, 1);
    circuit.h(QubitId(0)).unwrap();
    circuit.measure(QubitId(0), ClbitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();

    for level in 0..=3 {
        let compiled = transpile(&circuit, &Target::new(BasisGates::universal()), level).unwrap();
        assert_eq!(
            ops_on_qubit(&compiled.circuit, QubitId(0)),
            ["h", "measure", "h"],
            "level {level}"
        );
    }
}

#[test]
fn test_cx_pair_split_by_measure() {
    let mut circuit = Circuit::with_size("cx", 2, 1);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.measure(QubitId(0), ClbitId(0)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();

    let compiled = transpile(&circuit, &Target::new(BasisGates::ibm()), 3).unwrap();
    assert_eq!(compiled.circuit.count_ops().get("cx"), Some(&2));
}

#[test]
fn test_measurements_kept_after_routing() {
    let circuit = Circuit::ghz(4).unwrap();
    let target = Target::new(BasisGates::ibm()).with_coupling_map(CouplingMap::star(5));
    let compiled = transpile(&circuit, &target, 2).unwrap();

    let ops = compiled.circuit.count_ops();
    assert_eq!(ops.get("measure"), Some(&4));
    assert!(ops.get("swap").is_none(), "swaps are translated to cx");
    for inst in compiled.circuit.instructions() {
        if inst.qubits.len() == 2 {
            let (a, b) = (inst.qubits[0].0, inst.qubits[1].0);
            assert!(a == 0 || b == 0, "{} on {a},{b} is not on a star edge", inst.name());
        }
    }
    // each virtual clbit is still written exactly once
    let mut written: Vec<u32> = compiled
        .circuit
        .instructions()
        .iter()
        .filter(|i| i.is_measure())
        .map(|i| i.clbits[0].0)
        .collect();
    written.sort_unstable();
    assert_eq!(written, [0, 1, 2, 3]);
}

#[test]
fn test_original_circuit_untouched() {
    let circuit = Circuit::bell().unwrap();
    let before = circuit.clone();
    let _ = transpile(&circuit, &Target::new(BasisGates::ibm()), 3).unwrap();
    assert_eq!(circuit.instructions(), before.instructions());
}

// ============================================================================
// Single-qubit equivalence
// ============================================================================

fn arb_1q_gate() -> impl Strategy<Value = StandardGate> {
    let angle = -PI..PI;
    prop_oneof![
        Just(StandardGate::H),
        Just(StandardGate::X),
        Just(StandardGate::Y),
        Just(StandardGate::S),
        Just(StandardGate::Tdg),
        Just(StandardGate::SX),
        angle.clone().prop_map(StandardGate::Rx),
        angle.clone().prop_map(StandardGate::Ry),
        angle.clone().prop_map(StandardGate::Rz),
        (angle.clone(), angle.clone(), angle).prop_map(|(t, p, l)| StandardGate::U(t, p, l)),
    ]
}

proptest! {
    #[test]
    fn transpiled_single_qubit_programs_are_equivalent(
        gates in prop::collection::vec(arb_1q_gate(), 1..12),
        level in 0_u8..=3,
    ) {
        let mut circuit = Circuit::with_size("p", 1, 0);
        for g in &gates {
            circuit.gate(*g, [QubitId(0)]).unwrap();
        }
        let compiled = transpile(&circuit, &Target::new(BasisGates::ibm()), level).unwrap();
        let basis = BasisGates::ibm();
        for inst in compiled.circuit.instructions() {
            prop_assert!(basis.contains(inst.name()));
        }
        prop_assert!(product(&compiled.circuit).equiv(&product(&circuit)));
    }
}
