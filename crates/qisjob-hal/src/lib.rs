//! qisjob hardware abstraction layer
//!
//! Every vendor is reached through the same two traits: a [`Provider`]
//! hands out [`Backend`]s, and a backend runs circuits as jobs.
//!
//! # Supported Providers
//!
//! | Provider | Crate | Authentication |
//! |----------|-------|----------------|
//! | Local simulator | `qisjob-adapter-sim` | None |
//! | IBM Quantum | `qisjob-adapter-ibm` | token + url, `QISKIT_IBM_TOKEN`, `~/.qiskit/qiskit-ibm.json` |
//! | Quantum Inspire | `qisjob-adapter-qi` | `QI_TOKEN`, `~/.quantuminspire/config.json` |
//! | Rigetti QVM | `qisjob-adapter-forest` | None (`QVM_URL`) |
//! | MQT DDSIM | `qisjob-adapter-ddsim` | None (`DDSIM_PATH`) |
//!
//! # Implementing a Backend
//!
//! ```ignore
//! use qisjob_hal::{Backend, BackendConfiguration, BackendStatus, HalResult, JobId, RunOptions};
//! use async_trait::async_trait;
//!
//! struct MyBackend {
//!     configuration: BackendConfiguration,
//! }
//!
//! #[async_trait]
//! impl Backend for MyBackend {
//!     fn name(&self) -> &str { &self.configuration.backend_name }
//!     fn configuration(&self) -> &BackendConfiguration { &self.configuration }
//!     async fn status(&self) -> HalResult<BackendStatus> {
//!         Ok(BackendStatus::active(self.name()))
//!     }
//!     async fn submit(&self, circuits: &[Circuit], options: &RunOptions) -> HalResult<JobId> {
//!         // hand the circuits to the vendor
//!     }
//!     // ...
//! }
//! ```

pub mod auth;
pub mod backend;
pub mod error;
pub mod job;
pub mod noise;
pub mod provider;
pub mod result;

pub use auth::Credentials;
pub use backend::{
    check_width, Backend, BackendConfiguration, BackendProperties, BackendStatus, GateProperties,
    Nduv, RunOptions,
};
pub use error::{HalError, HalResult};
pub use job::{JobId, JobRecord, JobStatus};
pub use noise::NoiseProfile;
pub use provider::{first_fit, least_busy, Provider};
pub use result::{bit_label, Counts, ExperimentResult, JobResult};
