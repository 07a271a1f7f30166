//! MQT DDSIM provider for qisjob.
//!
//! Runs the decision-diagram simulator's `ddsim_simple` executable as a
//! subprocess: the circuit is written to a temporary OpenQASM file, and the
//! JSON the simulator prints is mapped back to counts and, for
//! `statevector_simulator`, the final state.
//!
//! `DDSIM_PATH` names the executable; otherwise `ddsim_simple` is looked up
//! on `PATH`. A non-zero exit is a failed job carrying the simulator's
//! message.

mod backend;
mod error;
mod provider;
mod runner;

pub use backend::{DdsimBackend, DdsimKind};
pub use error::{DdsimError, DdsimResult};
pub use provider::DdsimProvider;
pub use runner::{DdsimOutput, DdsimRunner, DDSIM_PATH_VAR, DEFAULT_PROGRAM};
