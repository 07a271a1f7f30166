//! Layout passes for placing virtual qubits on physical qubits.

use qisjob_ir::Circuit;

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{CouplingMap, Layout, PropertySet};

fn check_fits(circuit: &Circuit, coupling_map: &CouplingMap) -> CompileResult<()> {
    if circuit.num_qubits() > coupling_map.num_qubits() as usize {
        return Err(CompileError::CircuitTooLarge {
            required: circuit.num_qubits(),
            available: coupling_map.num_qubits(),
        });
    }
    Ok(())
}

/// Virtual qubit i on physical qubit i.
pub struct TrivialLayout;

impl Pass for TrivialLayout {
    fn name(&self) -> &'static str {
        "TrivialLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        check_fits(circuit, coupling_map)?;
        properties.layout = Some(Layout::trivial(circuit.num_qubits() as u32));
        Ok(())
    }

    fn should_run(&self, _circuit: &Circuit, properties: &PropertySet) -> bool {
        properties.layout.is_none() && properties.coupling_map.is_some()
    }
}

/// Place the circuit on a densely connected region of the device.
///
/// Starts at the highest-degree physical qubit and grows the region by the
/// candidate with the most edges into it; ties go to the lower index.
pub struct DenseLayout;

impl DenseLayout {
    fn select(coupling_map: &CouplingMap, count: usize) -> Vec<u32> {
        let n = coupling_map.num_qubits();
        let Some(start) = (0..n).max_by_key(|&q| (coupling_map.degree(q), std::cmp::Reverse(q)))
        else {
            return vec![];
        };
        let mut chosen = vec![start];

        while chosen.len() < count {
            let next = (0..n)
                .filter(|q| !chosen.contains(q))
                .max_by_key(|&q| {
                    let links = coupling_map
                        .neighbors(q)
                        .filter(|nb| chosen.contains(nb))
                        .count();
                    (links, std::cmp::Reverse(q))
                });
            match next {
                Some(q) => chosen.push(q),
                None => break,
            }
        }
        chosen
    }
}

impl Pass for DenseLayout {
    fn name(&self) -> &'static str {
        "DenseLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        check_fits(circuit, coupling_map)?;
        let physical = Self::select(coupling_map, circuit.num_qubits());
        properties.layout = Some(Layout::from_physical(physical));
        Ok(())
    }

    fn should_run(&self, _circuit: &Circuit, properties: &PropertySet) -> bool {
        properties.layout.is_none() && properties.coupling_map.is_some()
    }
}

#[cfg(test)]
mod tests {
    use qisjob_ir::QubitId;

    use super::*;

    #[test]
    fn test_trivial_layout() {
        let mut circuit = Circuit::with_size("t", 3, 0);
        let mut props = PropertySet {
            coupling_map: Some(CouplingMap::linear(5)),
            ..PropertySet::default()
        };
        TrivialLayout.run(&mut circuit, &mut props).unwrap();
        let layout = props.layout.unwrap();
        assert_eq!(layout.physical(QubitId(2)), Some(2));
        assert_eq!(layout.len(), 3);
    }

    #[test]
    fn test_layout_too_large() {
        let mut circuit = Circuit::with_size("t", 6, 0);
        let mut props = PropertySet {
            coupling_map: Some(CouplingMap::linear(5)),
            ..PropertySet::default()
        };
        assert!(matches!(
            TrivialLayout.run(&mut circuit, &mut props),
            Err(CompileError::CircuitTooLarge { required: 6, available: 5 })
        ));
    }

    #[test]
    fn test_dense_layout_prefers_hub() {
        // T shape: 1 is the hub of 0, 2 and 3; 3-4 hangs off
        let map = CouplingMap::from_edges(5, [(0, 1), (1, 2), (1, 3), (3, 4)]);
        let mut circuit = Circuit::with_size("t", 3, 0);
        let mut props = PropertySet {
            coupling_map: Some(map),
            ..PropertySet::default()
        };
        DenseLayout.run(&mut circuit, &mut props).unwrap();
        let layout = props.layout.unwrap();
        assert_eq!(layout.physical(QubitId(0)), Some(1));
        assert_eq!(layout.physical(QubitId(1)), Some(0));
        assert_eq!(layout.physical(QubitId(2)), Some(2));
    }
}
