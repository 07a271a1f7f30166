//! Routing: rewrite a circuit onto physical qubits, inserting SWAPs.

use qisjob_ir::{Circuit, Instruction, QubitId, StandardGate};
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Greedy shortest-path routing.
///
/// The output circuit has one quantum register `q` spanning every physical
/// qubit of the device; classical registers are kept. Each two-qubit gate on
/// non-adjacent qubits moves its first operand along the shortest path
/// towards the second. Gates on three or more qubits must be unrolled first.
pub struct BasicRouting;

impl Pass for BasicRouting {
    fn name(&self) -> &'static str {
        "BasicRouting"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        let mut layout = properties
            .layout
            .clone()
            .ok_or(CompileError::MissingLayout)?;

        let mut routed = Circuit::new(circuit.name());
        routed.add_qreg("q", coupling_map.num_qubits())?;
        for creg in circuit.cregs() {
            routed.add_creg(creg.name.as_str(), creg.size)?;
        }

        let place = |layout: &crate::property::Layout, q: QubitId| {
            layout
                .physical(q)
                .map(QubitId)
                .ok_or(CompileError::MissingLayout)
        };

        let mut swaps = 0usize;
        for inst in circuit.instructions() {
            if inst.is_gate() && inst.qubits.len() == 2 {
                let p0 = place(&layout, inst.qubits[0])?.0;
                let p1 = place(&layout, inst.qubits[1])?.0;
                if !coupling_map.is_connected(p0, p1) {
                    let path = coupling_map
                        .shortest_path(p0, p1)
                        .ok_or(CompileError::RoutingFailed {
                            qubit1: p0,
                            qubit2: p1,
                        })?;
                    for hop in path.windows(2).take(path.len().saturating_sub(2)) {
                        routed.push(Instruction::two_qubit_gate(
                            StandardGate::Swap,
                            QubitId(hop[0]),
                            QubitId(hop[1]),
                        ))?;
                        layout.swap_physical(hop[0], hop[1]);
                        swaps += 1;
                    }
                }
            } else if inst.is_gate() && inst.qubits.len() > 2 {
                return Err(CompileError::GateNotInTarget {
                    gate: inst.name().to_string(),
                    basis: "two-qubit routing".into(),
                });
            }

            let mut mapped = inst.clone();
            mapped.qubits = inst
                .qubits
                .iter()
                .map(|&q| place(&layout, q))
                .collect::<CompileResult<_>>()?;
            routed.push(mapped)?;
        }

        debug!(swaps, "routing inserted swaps");
        properties.final_layout = Some(layout);
        *circuit = routed;
        Ok(())
    }

    fn should_run(&self, _circuit: &Circuit, properties: &PropertySet) -> bool {
        properties.coupling_map.is_some() && properties.layout.is_some()
    }
}

#[cfg(test)]
mod tests {
    use qisjob_ir::ClbitId;

    use super::*;
    use crate::passes::TrivialLayout;
    use crate::property::CouplingMap;

    fn props(map: CouplingMap) -> PropertySet {
        PropertySet {
            coupling_map: Some(map),
            ..PropertySet::default()
        }
    }

    #[test]
    fn test_adjacent_gate_untouched() {
        let mut circuit = Circuit::bell().unwrap();
        let mut props = props(CouplingMap::linear(5));
        TrivialLayout.run(&mut circuit, &mut props).unwrap();
        BasicRouting.run(&mut circuit, &mut props).unwrap();

        assert_eq!(circuit.num_qubits(), 5);
        assert_eq!(circuit.instructions().len(), 4);
        assert_eq!(circuit.count_ops().get("swap"), None);
    }

    #[test]
    fn test_distant_gate_gets_swaps() {
        let mut circuit = Circuit::with_size("far", 4, 4);
        circuit.cx(QubitId(0), QubitId(3)).unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        let mut props = props(CouplingMap::linear(4));
        TrivialLayout.run(&mut circuit, &mut props).unwrap();
        BasicRouting.run(&mut circuit, &mut props).unwrap();

        assert_eq!(circuit.count_ops().get("swap"), Some(&2));
        let cx = &circuit.instructions()[2];
        assert_eq!(cx.qubits, vec![QubitId(2), QubitId(3)]);

        // The measurement follows virtual qubit 0 to its new home
        let measure = &circuit.instructions()[3];
        assert_eq!(measure.qubits, vec![QubitId(2)]);
        assert_eq!(
            props.final_layout.and_then(|l| l.physical(QubitId(0))),
            Some(2)
        );
    }

    #[test]
    fn test_disconnected_device() {
        let mut circuit = Circuit::with_size("split", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let mut props = props(CouplingMap::from_edges(4, [(0, 2), (1, 3)]));
        TrivialLayout.run(&mut circuit, &mut props).unwrap();
        assert!(matches!(
            BasicRouting.run(&mut circuit, &mut props),
            Err(CompileError::RoutingFailed { .. })
        ));
    }
}
