//! Rigetti Forest provider for qisjob.
//!
//! Talks to a QVM server (`qvm -S`) over its HTTP interface. Circuits are
//! compiled to Quil; measurements land in the `ro` register and come back
//! one row per shot.
//!
//! | Backend | Returns |
//! |---------|---------|
//! | `qasm_simulator` | counts, optional memory |
//! | `statevector_simulator` | counts and the final wavefunction |
//! | `9q-square`, `Aspen-11`, `Nq` | counts, compiled to `rx`/`rz`/`cz` on the device topology |
//!
//! The server address comes from `QVM_URL` (default `http://127.0.0.1:5000`).

mod api;
mod backend;
mod device;
mod error;
mod provider;
mod quil;

pub use api::{QvmClient, DEFAULT_URL};
pub use backend::{QvmBackend, QvmKind, QVM_MAX_QUBITS};
pub use device::{Device, KNOWN_DEVICES};
pub use error::{ForestError, ForestResult};
pub use provider::{ForestProvider, QVM_URL_VAR};
pub use quil::{quil_target, to_quil, to_quil_for, QUIL_BASIS, RIGETTI_BASIS};
