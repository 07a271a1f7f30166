//! Quantum Inspire provider for qisjob.
//!
//! Circuits are rewritten into the cQASM 1.0 gate set and run one per
//! service job. Results arrive as probability histograms over the qubit
//! register and are scaled back to shot counts over the circuit's own
//! classical bits.
//!
//! The token comes from `--token`, `QI_TOKEN`, or
//! `~/.quantuminspire/config.json`. `API_URL` overrides the endpoint.
//!
//! Unlike the other providers, the default backend is the first one listed
//! with enough qubits rather than the least busy.

mod api;
mod backend;
mod cqasm;
mod error;
mod provider;

pub use api::{QiClient, DEFAULT_URL};
pub use backend::QiBackend;
pub use cqasm::{to_cqasm, QI_BASIS};
pub use error::{QiError, QiResult};
pub use provider::{saved_token, token_from_file, QiProvider, TOKEN_FILE};
