//! qisjob transpiler
//!
//! Rewrites a [`Circuit`](qisjob_ir::Circuit) for a device: its native gate
//! set and, when the device has restricted connectivity, its coupling map.
//! Compilation is a sequence of [`Pass`]es sharing a [`PropertySet`].
//!
//! ```text
//! Circuit ─► Unroll3qOrMore ─► Trivial/DenseLayout ─► BasicRouting
//!         ─► BasisTranslation ─► CancelInversePairs ─► Optimize1qGates
//! ```
//!
//! Passes after translation keep the circuit inside the basis.
//!
//! # Example
//!
//! ```rust
//! use qisjob_compile::{transpile, BasisGates, CouplingMap, Target};
//! use qisjob_ir::Circuit;
//!
//! let circuit = Circuit::ghz(3).unwrap();
//! let target = Target::new(BasisGates::ibm()).with_coupling_map(CouplingMap::linear(5));
//! let compiled = transpile(&circuit, &target, 1).unwrap();
//!
//! assert_eq!(compiled.circuit.num_qubits(), 5);
//! assert!(compiled.circuit.count_ops().get("h").is_none());
//! ```
//!
//! # Optimization Levels
//!
//! | Level | Passes Included |
//! |-------|-----------------|
//! | 0 | Unroll, trivial layout, routing, basis translation |
//! | 1 | + inverse pair cancellation |
//! | 2 | + dense layout, single-qubit run merging |
//! | 3 | + a second optimization round |

pub mod error;
pub mod manager;
pub mod pass;
pub mod passes;
pub mod property;
pub mod schedule;
pub mod unitary;

pub use error::{CompileError, CompileResult};
pub use manager::{transpile, PassManager, PassManagerBuilder, Transpiled};
pub use pass::{Pass, PassKind};
pub use property::{BasisGates, CouplingMap, Layout, PropertySet, Target};
pub use schedule::{schedule_asap, InstructionDurations, Schedule, ScheduledInstruction};
