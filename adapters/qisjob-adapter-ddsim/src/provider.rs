//! DDSIM provider.

use std::sync::Arc;

use async_trait::async_trait;
use qisjob_hal::{first_fit, Backend, HalResult, Provider};

use crate::backend::{DdsimBackend, DdsimKind};
use crate::error::{DdsimError, DdsimResult};
use crate::runner::DdsimRunner;

/// The MQT DDSIM simulators behind one executable.
pub struct DdsimProvider {
    runner: Arc<DdsimRunner>,
}

impl DdsimProvider {
    pub fn new(runner: DdsimRunner) -> Self {
        Self {
            runner: Arc::new(runner),
        }
    }

    /// Use the executable named by `DDSIM_PATH`.
    pub fn from_env() -> Self {
        Self::new(DdsimRunner::from_env())
    }

    pub fn backend(&self, name: &str) -> DdsimResult<DdsimBackend> {
        let kind =
            DdsimKind::from_name(name).ok_or_else(|| DdsimError::UnknownBackend(name.to_string()))?;
        Ok(DdsimBackend::new(self.runner.clone(), kind))
    }
}

#[async_trait]
impl Provider for DdsimProvider {
    fn name(&self) -> &str {
        "MQT"
    }

    async fn backends(&self) -> HalResult<Vec<Arc<dyn Backend>>> {
        Ok([DdsimKind::Qasm, DdsimKind::Statevector]
            .into_iter()
            .map(|kind| Arc::new(DdsimBackend::new(self.runner.clone(), kind)) as Arc<dyn Backend>)
            .collect())
    }

    async fn get_backend(&self, name: &str) -> HalResult<Option<Arc<dyn Backend>>> {
        Ok(self
            .backend(name)
            .ok()
            .map(|backend| Arc::new(backend) as Arc<dyn Backend>))
    }

    async fn default_backend(&self, min_qubits: u32) -> HalResult<Arc<dyn Backend>> {
        first_fit(self.backends().await?, min_qubits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_backends() {
        let mqt = DdsimProvider::new(DdsimRunner::new("ddsim_simple"));
        let names: Vec<String> = mqt
            .backends()
            .await
            .unwrap()
            .iter()
            .map(|b| b.name().to_string())
            .collect();
        assert_eq!(names, ["qasm_simulator", "statevector_simulator"]);
        assert!(mqt.get_backend("unitary_simulator").await.unwrap().is_none());
        assert_eq!(mqt.default_backend(5).await.unwrap().name(), "qasm_simulator");
        assert_eq!(mqt.default_backend(100).await.unwrap().name(), "qasm_simulator");
    }
}
