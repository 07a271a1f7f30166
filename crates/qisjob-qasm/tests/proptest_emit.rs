//! Property-based tests: circuit → `OpenQASM` 2.0 text → circuit.

use proptest::prelude::*;
use qisjob_ir::{Circuit, InstructionKind, QubitId, StandardGate};
use qisjob_qasm::{emit, parse};

#[derive(Debug, Clone)]
enum GateOp {
    H(u32),
    Sx(u32),
    Rz(f64, u32),
    U(f64, f64, f64, u32),
    Cx(u32, u32),
    Cp(f64, u32, u32),
}

impl GateOp {
    fn apply(self, circuit: &mut Circuit) {
        let _ = match self {
            GateOp::H(q) => circuit.h(QubitId(q)),
            GateOp::Sx(q) => circuit.sx(QubitId(q)),
            GateOp::Rz(a, q) => circuit.rz(a, QubitId(q)),
            GateOp::U(t, p, l, q) => circuit.u(t, p, l, QubitId(q)),
            GateOp::Cx(a, b) => circuit.cx(QubitId(a), QubitId(b)),
            GateOp::Cp(theta, a, b) => circuit.gate(StandardGate::CP(theta), [QubitId(a), QubitId(b)]),
        };
    }
}

fn angle() -> impl Strategy<Value = f64> {
    prop_oneof![
        -10.0_f64..10.0,
        (-8_i32..=8).prop_map(|k| f64::from(k) * std::f64::consts::PI / 4.0),
    ]
}

fn arb_gate_op(num_qubits: u32) -> impl Strategy<Value = GateOp> {
    let q = 0..num_qubits;
    let pair = (0..num_qubits, 0..num_qubits).prop_filter("distinct qubits", |(a, b)| a != b);
    prop_oneof![
        q.clone().prop_map(GateOp::H),
        q.clone().prop_map(GateOp::Sx),
        (angle(), q.clone()).prop_map(|(a, q)| GateOp::Rz(a, q)),
        (angle(), angle(), angle(), q).prop_map(|(t, p, l, q)| GateOp::U(t, p, l, q)),
        pair.clone().prop_map(|(a, b)| GateOp::Cx(a, b)),
        (angle(), pair).prop_map(|(t, (a, b))| GateOp::Cp(t, a, b)),
    ]
}

fn arb_circuit() -> impl Strategy<Value = Circuit> {
    (2_u32..=5).prop_flat_map(|n| {
        prop::collection::vec(arb_gate_op(n), 1..=12).prop_map(move |ops| {
            let mut circuit = Circuit::with_size("prop", n, n);
            for op in ops {
                op.apply(&mut circuit);
            }
            let _ = circuit.measure_all();
            circuit
        })
    })
}

fn same_gate(a: &StandardGate, b: &StandardGate) -> bool {
    a.name() == b.name()
        && a.params()
            .iter()
            .zip(b.params())
            .all(|(x, y)| (x - y).abs() < 1e-9)
}

proptest! {
    #[test]
    fn emitted_text_parses_back(circuit in arb_circuit()) {
        let text = emit(&circuit);
        let reparsed = parse(&text).unwrap();

        prop_assert_eq!(circuit.num_qubits(), reparsed.num_qubits());
        prop_assert_eq!(circuit.num_clbits(), reparsed.num_clbits());
        prop_assert_eq!(circuit.instructions().len(), reparsed.instructions().len());

        for (a, b) in circuit.instructions().iter().zip(reparsed.instructions()) {
            prop_assert_eq!(&a.qubits, &b.qubits);
            prop_assert_eq!(&a.clbits, &b.clbits);
            match (&a.kind, &b.kind) {
                (InstructionKind::Gate(ga), InstructionKind::Gate(gb)) => {
                    prop_assert!(same_gate(ga, gb), "{:?} != {:?}", ga, gb);
                }
                (ka, kb) => prop_assert_eq!(ka, kb),
            }
        }
    }

    #[test]
    fn depth_survives_emission(circuit in arb_circuit()) {
        let reparsed = parse(&emit(&circuit)).unwrap();
        prop_assert_eq!(circuit.depth(), reparsed.depth());
    }
}
