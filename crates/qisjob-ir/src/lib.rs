//! qisjob circuit representation
//!
//! The data structures every other qisjob crate speaks: registers of qubits
//! and classical bits, the standard gate set of `qelib1.inc`, instructions and
//! the [`Circuit`] that orders them.
//!
//! Circuits here are flat instruction lists. Gate definitions from OpenQASM
//! source are inlined by the parser, so every gate in a [`Circuit`] is a
//! [`StandardGate`] with concrete angles.
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use qisjob_ir::{Circuit, QubitId, ClbitId};
//!
//! let mut circuit = Circuit::with_size("entangle", 2, 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure(QubitId(0), ClbitId(0)).unwrap();
//! circuit.measure(QubitId(1), ClbitId(1)).unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.depth(), 3);
//! assert!(circuit.has_measurements());
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Description |
//! |------|--------|-------------|
//! | `id`, `x`, `y`, `z` | 1 | Identity and Pauli gates |
//! | `h`, `s`, `sdg`, `t`, `tdg`, `sx`, `sxdg` | 1 | Clifford+T family |
//! | `rx`, `ry`, `rz`, `p`, `u` | 1 | Rotations and the universal U(θ,φ,λ) |
//! | `cx`, `cy`, `cz`, `ch`, `swap` | 2 | Controlled Paulis, CH and SWAP |
//! | `crx`, `cry`, `crz`, `cp`, `cu` | 2 | Controlled rotations |
//! | `rxx`, `rzz` | 2 | Two-qubit Ising rotations |
//! | `ccx`, `cswap` | 3 | Toffoli and Fredkin |

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod qubit;

pub use circuit::{Circuit, Register};
pub use error::{IrError, IrResult};
pub use gate::StandardGate;
pub use instruction::{ClassicalCondition, Instruction, InstructionKind};
pub use qubit::{Clbit, ClbitId, Qubit, QubitId};
