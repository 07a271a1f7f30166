//! Forest provider: a QVM server reached over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use qisjob_hal::auth::env_var;
use qisjob_hal::{first_fit, Backend, HalResult, Provider};
use tracing::debug;

use crate::api::{QvmClient, DEFAULT_URL};
use crate::backend::{QvmBackend, QvmKind};
use crate::device::{Device, KNOWN_DEVICES};
use crate::error::{ForestError, ForestResult};

/// Environment variable naming the QVM server.
pub const QVM_URL_VAR: &str = "QVM_URL";

/// Handle to one QVM server. No account is involved.
pub struct ForestProvider {
    client: Arc<QvmClient>,
}

impl ForestProvider {
    pub fn new(url: impl Into<String>) -> ForestResult<Self> {
        Ok(Self {
            client: Arc::new(QvmClient::new(url)?),
        })
    }

    /// The server named by `QVM_URL`, else the default local address.
    pub fn from_env() -> ForestResult<Self> {
        let url = env_var(QVM_URL_VAR).unwrap_or_else(|| DEFAULT_URL.to_string());
        debug!(%url, "QVM server");
        Self::new(url)
    }

    /// A plain QVM: `qasm_simulator` or `statevector_simulator`.
    pub fn qvm(&self, name: &str) -> ForestResult<QvmBackend> {
        let kind = QvmKind::from_name(name)
            .ok_or_else(|| ForestError::UnknownBackend(name.to_string()))?;
        Ok(QvmBackend::new(self.client.clone(), kind))
    }

    /// A QVM emulating the named Rigetti device.
    pub fn qvm_as(&self, name: &str) -> ForestResult<QvmBackend> {
        let device =
            Device::lookup(name).ok_or_else(|| ForestError::UnknownDevice(name.to_string()))?;
        Ok(QvmBackend::emulating(self.client.clone(), &device))
    }
}

#[async_trait]
impl Provider for ForestProvider {
    fn name(&self) -> &str {
        "Forest"
    }

    async fn backends(&self) -> HalResult<Vec<Arc<dyn Backend>>> {
        let mut backends: Vec<Arc<dyn Backend>> = [QvmKind::Qasm, QvmKind::Statevector]
            .into_iter()
            .map(|kind| Arc::new(QvmBackend::new(self.client.clone(), kind)) as Arc<dyn Backend>)
            .collect();
        for name in KNOWN_DEVICES {
            backends.push(Arc::new(self.qvm_as(name)?));
        }
        Ok(backends)
    }

    async fn get_backend(&self, name: &str) -> HalResult<Option<Arc<dyn Backend>>> {
        if let Ok(backend) = self.qvm(name) {
            return Ok(Some(Arc::new(backend)));
        }
        Ok(self
            .qvm_as(name)
            .ok()
            .map(|backend| Arc::new(backend) as Arc<dyn Backend>))
    }

    /// Every QVM is a simulator, so the least-busy rule never applies.
    async fn default_backend(&self, min_qubits: u32) -> HalResult<Arc<dyn Backend>> {
        first_fit(self.backends().await?, min_qubits)
    }
}
