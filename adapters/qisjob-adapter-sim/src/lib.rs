//! qisjob local simulator
//!
//! Three in-process backends that need no network access:
//!
//! | Backend | Result |
//! |---------|--------|
//! | `qasm_simulator` | counts (and per-shot memory) |
//! | `statevector_simulator` | counts plus the final statevector |
//! | `unitary_simulator` | the circuit unitary |
//!
//! Circuits whose measurements all come at the end are sampled from one
//! final state. Anything else (mid-circuit measurement, reset, classical
//! conditions, or a noise profile) runs one trajectory per shot.
//!
//! # Memory
//!
//! | Qubits | Statevector | Unitary |
//! |--------|-------------|---------|
//! | 10 | 16 KB | 16 MB |
//! | 12 | 64 KB | 256 MB |
//! | 20 | 16 MB | - |
//! | 24 | 256 MB | - |
//!
//! # Noisy simulation
//!
//! A [`FakeBackend`] or a device's live calibration yields a
//! [`NoiseProfile`](qisjob_hal::NoiseProfile): depolarizing errors after
//! each gate and readout flips on each measurement.
//!
//! ```ignore
//! use qisjob_adapter_sim::{fake_backend, LocalSimulator, SimulatorKind, SimulatorOptions};
//!
//! let lima = fake_backend("FakeLima").unwrap();
//! let options = SimulatorOptions::default().with_noise(lima.noise_profile());
//! let backend = LocalSimulator::with_options(SimulatorKind::Qasm, options)?;
//! ```

mod fake;
mod options;
mod simulator;
mod statevector;

pub use fake::{fake_backend, fake_names, is_fake_name, FakeBackend};
pub use options::{Precision, SimulationMethod, SimulatorKind, SimulatorOptions};
pub use simulator::LocalSimulator;
pub use statevector::Statevector;
