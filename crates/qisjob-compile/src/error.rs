//! Error types for the compiler.

use qisjob_ir::IrError;
use thiserror::Error;

/// Compilation errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// A pass needs a coupling map and none was configured.
    #[error("Coupling map required but not set")]
    MissingCouplingMap,

    /// Routing ran before a layout was chosen.
    #[error("Layout required but not set")]
    MissingLayout,

    /// Circuit needs more qubits than the target has.
    #[error("Circuit requires {required} qubits but target has only {available}")]
    CircuitTooLarge { required: usize, available: u32 },

    /// No path connects two physical qubits.
    #[error("Cannot route between physical qubits {qubit1} and {qubit2}")]
    RoutingFailed { qubit1: u32, qubit2: u32 },

    /// A gate cannot be expressed in the target basis.
    #[error("Gate '{gate}' cannot be translated to basis [{basis}]")]
    GateNotInTarget { gate: String, basis: String },

    /// Optimization level outside 0..=3.
    #[error("Invalid optimization level {0}, expected 0-3")]
    InvalidOptimizationLevel(u8),

    /// IR error while rebuilding a circuit.
    #[error("IR error: {0}")]
    Ir(#[from] IrError),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
