//! IBM Quantum provider for qisjob.
//!
//! Circuits are sent to the sampler as OpenQASM 3; results come back as
//! per-shot hex samples and are tallied into counts here.
//!
//! # Credentials
//!
//! In order of precedence:
//!
//! 1. an explicit token and url (`--token`/`--url`)
//! 2. `QISKIT_IBM_TOKEN`, with optional `QISKIT_IBM_URL` and `QISKIT_IBM_INSTANCE`
//! 3. the `default-ibm-quantum` entry of `~/.qiskit/qiskit-ibm.json`
//!
//! ```ignore
//! use qisjob_adapter_ibm::IbmProvider;
//! use qisjob_hal::Provider;
//!
//! let provider = IbmProvider::from_saved_account(Some("ibm-q/open/main".into()))?;
//! let backend = provider.default_backend(5).await?;
//! ```

mod api;
mod backend;
mod error;
mod provider;

pub use api::{validate_instance, IbmClient, DEFAULT_URL};
pub use backend::IbmBackend;
pub use error::{IbmError, IbmResult};
pub use provider::{
    credentials_from_file, saved_credentials, IbmProvider, ACCOUNT_FILE, DEFAULT_ACCOUNT,
};
