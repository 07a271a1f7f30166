//! High-level circuit builder API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::instruction::{ClassicalCondition, Instruction, InstructionKind};
use crate::qubit::{Clbit, ClbitId, Qubit, QubitId};

/// A named register occupying a contiguous slice of qubits or clbits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    /// Register name.
    pub name: String,
    /// Number of bits.
    pub size: u32,
    /// Flat index of the register's first bit.
    pub offset: u32,
}

impl Register {
    /// Flat index of register element `index`, if in range.
    pub fn bit(&self, index: u32) -> Option<u32> {
        (index < self.size).then_some(self.offset + index)
    }
}

/// A quantum circuit.
///
/// Registers are kept in declaration order; qubit and clbit ids are assigned
/// contiguously as registers are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// Quantum registers in declaration order.
    qregs: Vec<Register>,
    /// Classical registers in declaration order.
    cregs: Vec<Register>,
    /// Qubits in the circuit.
    qubits: Vec<Qubit>,
    /// Classical bits in the circuit.
    clbits: Vec<Clbit>,
    /// Instructions in program order.
    instructions: Vec<Instruction>,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qregs: vec![],
            cregs: vec![],
            qubits: vec![],
            clbits: vec![],
            instructions: vec![],
        }
    }

    /// Create a circuit with registers `q` and `c` of the given sizes.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        let mut circuit = Self::new(name);
        if num_qubits > 0 {
            circuit.qregs.push(Register {
                name: "q".into(),
                size: num_qubits,
                offset: 0,
            });
            circuit
                .qubits
                .extend((0..num_qubits).map(|i| Qubit::new(QubitId(i), "q", i)));
        }
        if num_clbits > 0 {
            circuit.cregs.push(Register {
                name: "c".into(),
                size: num_clbits,
                offset: 0,
            });
            circuit
                .clbits
                .extend((0..num_clbits).map(|i| Clbit::new(ClbitId(i), "c", i)));
        }
        circuit
    }

    /// Create an empty circuit with the same registers as `self`.
    pub fn empty_like(&self) -> Self {
        Self {
            name: self.name.clone(),
            qregs: self.qregs.clone(),
            cregs: self.cregs.clone(),
            qubits: self.qubits.clone(),
            clbits: self.clbits.clone(),
            instructions: vec![],
        }
    }

    /// Rename the circuit.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a quantum register.
    pub fn add_qreg(&mut self, name: impl Into<String>, size: u32) -> IrResult<Vec<QubitId>> {
        let name = name.into();
        if self.qregs.iter().chain(&self.cregs).any(|r| r.name == name) {
            return Err(IrError::DuplicateRegister(name));
        }
        let offset = self.qubits.len() as u32;
        let ids: Vec<QubitId> = (0..size).map(|i| QubitId(offset + i)).collect();
        for (i, id) in ids.iter().enumerate() {
            self.qubits.push(Qubit::new(*id, &name, i as u32));
        }
        self.qregs.push(Register { name, size, offset });
        Ok(ids)
    }

    /// Add a classical register.
    pub fn add_creg(&mut self, name: impl Into<String>, size: u32) -> IrResult<Vec<ClbitId>> {
        let name = name.into();
        if self.qregs.iter().chain(&self.cregs).any(|r| r.name == name) {
            return Err(IrError::DuplicateRegister(name));
        }
        let offset = self.clbits.len() as u32;
        let ids: Vec<ClbitId> = (0..size).map(|i| ClbitId(offset + i)).collect();
        for (i, id) in ids.iter().enumerate() {
            self.clbits.push(Clbit::new(*id, &name, i as u32));
        }
        self.cregs.push(Register { name, size, offset });
        Ok(ids)
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::H, [qubit])
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::X, [qubit])
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Y, [qubit])
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Z, [qubit])
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::S, [qubit])
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::T, [qubit])
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::SX, [qubit])
    }

    /// Apply Rx rotation gate.
    pub fn rx(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Rx(theta), [qubit])
    }

    /// Apply Ry rotation gate.
    pub fn ry(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Ry(theta), [qubit])
    }

    /// Apply Rz rotation gate.
    pub fn rz(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Rz(theta), [qubit])
    }

    /// Apply U(θ, φ, λ).
    pub fn u(&mut self, theta: f64, phi: f64, lambda: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::U(theta, phi, lambda), [qubit])
    }

    // =========================================================================
    // Multi-qubit gates
    // =========================================================================

    /// Apply CNOT gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::CX, [control, target])
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::CZ, [control, target])
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::Swap, [q1, q2])
    }

    /// Apply Toffoli gate.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.gate(StandardGate::CCX, [c1, c2, target])
    }

    /// Apply any standard gate.
    pub fn gate(
        &mut self,
        gate: StandardGate,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.push(Instruction::gate(gate, qubits))
    }

    // =========================================================================
    // Non-unitary operations
    // =========================================================================

    /// Measure a qubit into a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.push(Instruction::measure(qubit, clbit))
    }

    /// Measure every qubit into the classical bit of the same index.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        if self.qubits.len() > self.clbits.len() {
            return Err(IrError::MeasureMismatch {
                qubits: self.qubits.len(),
                clbits: self.clbits.len(),
            });
        }
        for i in 0..self.qubits.len() as u32 {
            self.measure(QubitId(i), ClbitId(i))?;
        }
        Ok(self)
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::reset(qubit))
    }

    /// Add a barrier across the given qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.push(Instruction::barrier(qubits))
    }

    /// Append an instruction after validating its operands.
    pub fn push(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        self.validate(&instruction)?;
        self.instructions.push(instruction);
        Ok(self)
    }

    fn validate(&self, instruction: &Instruction) -> IrResult<()> {
        let gate_name = || Some(instruction.name().to_string());

        if let InstructionKind::Gate(gate) = &instruction.kind {
            let got = instruction.qubits.len() as u32;
            if got != gate.num_qubits() {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected: gate.num_qubits(),
                    got,
                });
            }
        }
        if instruction.is_measure() && instruction.qubits.len() != instruction.clbits.len() {
            return Err(IrError::MeasureMismatch {
                qubits: instruction.qubits.len(),
                clbits: instruction.clbits.len(),
            });
        }

        for (i, q) in instruction.qubits.iter().enumerate() {
            if q.index() >= self.qubits.len() {
                return Err(IrError::QubitNotFound {
                    qubit: *q,
                    gate_name: gate_name(),
                });
            }
            if instruction.qubits[..i].contains(q) {
                return Err(IrError::DuplicateQubit {
                    qubit: *q,
                    gate_name: gate_name(),
                });
            }
        }
        for c in &instruction.clbits {
            if c.index() >= self.clbits.len() {
                return Err(IrError::ClbitNotFound {
                    clbit: *c,
                    gate_name: gate_name(),
                });
            }
        }
        if let Some(cond) = &instruction.condition {
            if self.creg(&cond.register).is_none() {
                return Err(IrError::RegisterNotFound(cond.register.clone()));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.clbits.len()
    }

    /// Qubits in id order.
    pub fn qubits(&self) -> &[Qubit] {
        &self.qubits
    }

    /// Classical bits in id order.
    pub fn clbits(&self) -> &[Clbit] {
        &self.clbits
    }

    /// Quantum registers in declaration order.
    pub fn qregs(&self) -> &[Register] {
        &self.qregs
    }

    /// Classical registers in declaration order.
    pub fn cregs(&self) -> &[Register] {
        &self.cregs
    }

    /// Look up a quantum register by name.
    pub fn qreg(&self, name: &str) -> Option<&Register> {
        self.qregs.iter().find(|r| r.name == name)
    }

    /// Look up a classical register by name.
    pub fn creg(&self, name: &str) -> Option<&Register> {
        self.cregs.iter().find(|r| r.name == name)
    }

    /// Instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Whether the circuit contains at least one measurement.
    pub fn has_measurements(&self) -> bool {
        self.instructions.iter().any(Instruction::is_measure)
    }

    /// Whether every measurement is terminal: nothing but barriers or further
    /// measurements touches a measured qubit afterwards, and no instruction is
    /// conditional or a reset.
    ///
    /// Circuits with this shape can be sampled from a single final state.
    pub fn has_terminal_measurements_only(&self) -> bool {
        let mut measured = vec![false; self.qubits.len()];
        for inst in &self.instructions {
            if inst.is_conditional() || matches!(inst.kind, InstructionKind::Reset) {
                return false;
            }
            match inst.kind {
                InstructionKind::Measure => {
                    for q in &inst.qubits {
                        measured[q.index()] = true;
                    }
                }
                InstructionKind::Barrier => {}
                _ => {
                    if inst.qubits.iter().any(|q| measured[q.index()]) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Circuit depth, counting every non-barrier instruction as one layer on
    /// the wires it touches. Conditions occupy the wires of their register.
    pub fn depth(&self) -> usize {
        let mut qubit_level = vec![0usize; self.qubits.len()];
        let mut clbit_level = vec![0usize; self.clbits.len()];
        let mut depth = 0;

        for inst in &self.instructions {
            if inst.is_barrier() {
                continue;
            }
            let cond_bits: Vec<usize> = inst
                .condition
                .as_ref()
                .and_then(|c| self.creg(&c.register))
                .map(|r| (r.offset..r.offset + r.size).map(|b| b as usize).collect())
                .unwrap_or_default();

            let start = inst
                .qubits
                .iter()
                .map(|q| qubit_level[q.index()])
                .chain(inst.clbits.iter().map(|c| clbit_level[c.index()]))
                .chain(cond_bits.iter().map(|&b| clbit_level[b]))
                .max()
                .unwrap_or(0);
            let level = start + 1;

            for q in &inst.qubits {
                qubit_level[q.index()] = level;
            }
            for c in &inst.clbits {
                clbit_level[c.index()] = level;
            }
            for b in cond_bits {
                clbit_level[b] = level;
            }
            depth = depth.max(level);
        }
        depth
    }

    /// Count operations by name.
    pub fn count_ops(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for inst in &self.instructions {
            *counts.entry(inst.name()).or_insert(0) += 1;
        }
        counts
    }

    /// The value of register `condition.register` required by a condition,
    /// expressed as (flat clbit index, expected bit) pairs.
    pub fn condition_bits(&self, condition: &ClassicalCondition) -> Option<Vec<(usize, bool)>> {
        let reg = self.creg(&condition.register)?;
        Some(
            (0..reg.size)
                .map(|i| {
                    let expected = i < 64 && (condition.value >> i) & 1 == 1;
                    ((reg.offset + i) as usize, expected)
                })
                .collect(),
        )
    }

    /// The circuit restricted to the qubits its instructions act on.
    ///
    /// Kept qubits are renumbered in order into a single register `q`; the
    /// returned ids give each one's index in `self`. Barrier operands on idle
    /// qubits are dropped. Classical registers are unchanged.
    pub fn without_idle_qubits(&self) -> (Self, Vec<QubitId>) {
        let mut active: Vec<QubitId> = self
            .instructions
            .iter()
            .filter(|inst| !inst.is_barrier())
            .flat_map(|inst| inst.qubits.iter().copied())
            .collect();
        active.sort_unstable();
        active.dedup();

        let mut renumbered = vec![None; self.qubits.len()];
        for (i, q) in active.iter().enumerate() {
            renumbered[q.index()] = Some(QubitId(i as u32));
        }

        let mut compact = Self::with_size(self.name.clone(), active.len() as u32, 0);
        compact.cregs.clone_from(&self.cregs);
        compact.clbits.clone_from(&self.clbits);
        for inst in &self.instructions {
            let qubits: Vec<QubitId> = inst
                .qubits
                .iter()
                .filter_map(|q| renumbered[q.index()])
                .collect();
            if inst.is_barrier() && qubits.is_empty() {
                continue;
            }
            compact.instructions.push(Instruction {
                qubits,
                ..inst.clone()
            });
        }
        (compact, active)
    }

    // =========================================================================
    // Stock circuits
    // =========================================================================

    /// Bell state preparation with measurement.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        circuit.h(QubitId(0))?.cx(QubitId(0), QubitId(1))?;
        circuit.measure_all()?;
        Ok(circuit)
    }

    /// n-qubit GHZ state preparation with measurement.
    pub fn ghz(n: u32) -> IrResult<Self> {
        let mut circuit = Self::with_size(format!("ghz_{n}"), n, n);
        if n == 0 {
            return Ok(circuit);
        }
        circuit.h(QubitId(0))?;
        for i in 1..n {
            circuit.cx(QubitId(i - 1), QubitId(i))?;
        }
        circuit.measure_all()?;
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bell_circuit() {
        let circuit = Circuit::bell().unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.depth(), 3);
        assert!(circuit.has_measurements());
        assert!(circuit.has_terminal_measurements_only());
        assert_eq!(circuit.count_ops().get("measure"), Some(&2));
    }

    #[test]
    fn test_without_idle_qubits() {
        let mut circuit = Circuit::with_size("routed", 6, 2);
        circuit.h(QubitId(3)).unwrap();
        circuit.cx(QubitId(3), QubitId(5)).unwrap();
        circuit.barrier((0..6).map(QubitId)).unwrap();
        circuit.barrier([QubitId(1)]).unwrap();
        circuit.measure(QubitId(3), ClbitId(0)).unwrap();
        circuit.measure(QubitId(5), ClbitId(1)).unwrap();

        let (compact, physical) = circuit.without_idle_qubits();
        assert_eq!(physical, vec![QubitId(3), QubitId(5)]);
        assert_eq!(compact.num_qubits(), 2);
        assert_eq!(compact.num_clbits(), 2);
        assert_eq!(compact.creg("c").map(|r| r.size), Some(2));
        assert_eq!(compact.instructions().len(), 5);
        assert_eq!(compact.instructions()[1].qubits, vec![QubitId(0), QubitId(1)]);
        assert_eq!(compact.instructions()[2].qubits, vec![QubitId(0), QubitId(1)]);
        assert_eq!(compact.instructions()[4].clbits, vec![ClbitId(1)]);
        assert_eq!(compact.count_ops().get("barrier"), Some(&1));
    }

    #[test]
    fn test_registers_are_contiguous() {
        let mut circuit = Circuit::new("regs");
        let a = circuit.add_qreg("a", 2).unwrap();
        let b = circuit.add_qreg("b", 3).unwrap();
        assert_eq!(a, vec![QubitId(0), QubitId(1)]);
        assert_eq!(b[0], QubitId(2));
        assert_eq!(circuit.qreg("b").and_then(|r| r.bit(2)), Some(4));
        assert_eq!(circuit.qreg("b").and_then(|r| r.bit(3)), None);
        assert_eq!(circuit.qubits()[3].to_string(), "b[1]");
    }

    #[test]
    fn test_duplicate_register_rejected() {
        let mut circuit = Circuit::new("dup");
        circuit.add_qreg("q", 1).unwrap();
        assert!(matches!(
            circuit.add_creg("q", 1),
            Err(IrError::DuplicateRegister(_))
        ));
    }

    #[test]
    fn test_operand_validation() {
        let mut circuit = Circuit::with_size("v", 2, 1);
        assert!(matches!(
            circuit.h(QubitId(5)),
            Err(IrError::QubitNotFound { .. })
        ));
        assert!(matches!(
            circuit.cx(QubitId(1), QubitId(1)),
            Err(IrError::DuplicateQubit { .. })
        ));
        assert!(matches!(
            circuit.gate(StandardGate::CX, [QubitId(0)]),
            Err(IrError::QubitCountMismatch { expected: 2, got: 1, .. })
        ));
        assert!(matches!(
            circuit.measure(QubitId(0), ClbitId(4)),
            Err(IrError::ClbitNotFound { .. })
        ));
        assert!(matches!(circuit.measure_all(), Err(IrError::MeasureMismatch { .. })));
    }

    #[test]
    fn test_mid_circuit_measurement_detected() {
        let mut circuit = Circuit::with_size("mid", 1, 1);
        circuit.h(QubitId(0)).unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        circuit.x(QubitId(0)).unwrap();
        assert!(!circuit.has_terminal_measurements_only());
    }

    #[test]
    fn test_condition_bits() {
        let mut circuit = Circuit::new("cond");
        circuit.add_qreg("q", 1).unwrap();
        circuit.add_creg("c", 3).unwrap();
        let bits = circuit
            .condition_bits(&ClassicalCondition::new("c", 5))
            .unwrap();
        assert_eq!(bits, vec![(0, true), (1, false), (2, true)]);

        let x = Instruction::single_qubit_gate(StandardGate::X, QubitId(0))
            .with_condition(ClassicalCondition::new("nope", 1));
        assert!(matches!(
            circuit.push(x),
            Err(IrError::RegisterNotFound(_))
        ));
    }

    #[test]
    fn test_ghz_depth() {
        let circuit = Circuit::ghz(4).unwrap();
        // H, three chained CX, then measurements
        assert_eq!(circuit.depth(), 5);
    }
}
