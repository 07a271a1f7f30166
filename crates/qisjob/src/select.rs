//! Choosing the backend a run goes to.

use std::sync::Arc;

use qisjob_adapter_forest::ForestProvider;
use qisjob_adapter_sim::{
    LocalSimulator as Simulator, SimulatorKind, SimulatorOptions, fake_backend, is_fake_name,
};
use qisjob_hal::{Backend, HalError, NoiseProfile, Provider};
use tracing::{debug, info, instrument, trace};

use crate::config::{CLOUD_SIMULATOR, JobConfig};
use crate::error::{QisJobError, QisJobResult};
use crate::inspect::lookup_backend;
use crate::provider::ProviderSlot;

/// Pick the backend for this invocation.
///
/// In order: noisy simulation, the local simulator, a Forest QVM, a
/// named backend, the cloud simulator, the provider's default.
#[instrument(skip_all)]
pub async fn choose_backend(
    config: &JobConfig,
    providers: &ProviderSlot,
) -> QisJobResult<Arc<dyn Backend>> {
    let backend: Arc<dyn Backend> = if config.noisy_sim {
        noisy_simulator(config, providers).await?
    } else if let Some(local) = &config.local_simulator {
        Arc::new(Simulator::with_options(local.kind, local.options.clone())?)
    } else if config.qvm || config.qvm_as {
        qvm(config)?
    } else {
        provider_backend(config, providers).await?
    };
    info!(backend = backend.name(), "backend chosen");
    Ok(backend)
}

async fn provider_backend(
    config: &JobConfig,
    providers: &ProviderSlot,
) -> QisJobResult<Arc<dyn Backend>> {
    let provider = providers.get(config).await?;
    debug!(provider = provider.name(), "provider");
    if tracing::enabled!(tracing::Level::TRACE) {
        let names: Vec<String> = provider
            .backends()
            .await?
            .iter()
            .map(|b| b.name().to_string())
            .collect();
        trace!(?names, "available backends");
    }

    if let Some(name) = &config.backend {
        return lookup_backend(provider, name).await;
    }
    if config.cloud_simulator {
        return lookup_backend(provider, CLOUD_SIMULATOR).await;
    }
    match provider.default_backend(config.qubits).await {
        Ok(backend) => Ok(backend),
        Err(e @ HalError::NoSuitableBackend(_)) => Err(QisJobError::runtime_from(
            format!("No suitable backend found for {} qubits", config.qubits),
            e,
        )),
        Err(e) => Err(e.into()),
    }
}

fn qvm(config: &JobConfig) -> QisJobResult<Arc<dyn Backend>> {
    let name = config
        .backend
        .as_deref()
        .ok_or_else(|| QisJobError::argument("qvm and qvm_as require backend"))?;
    let forest = ForestProvider::from_env().map_err(HalError::from)?;
    let backend = if config.qvm_as {
        forest.qvm_as(name)
    } else {
        forest.qvm(name)
    };
    Ok(Arc::new(backend.map_err(HalError::from)?))
}

/// Noise taken from the backend named by `-b`.
pub async fn noise_reference(
    config: &JobConfig,
    providers: &ProviderSlot,
) -> QisJobResult<NoiseProfile> {
    let name = config.backend.as_deref().ok_or_else(|| {
        QisJobError::argument("noisy_sim requires backend naming the noise reference")
    })?;
    if is_fake_name(name) {
        return fake_backend(name)
            .map(|fake| fake.noise_profile())
            .ok_or_else(|| QisJobError::runtime(format!("Backend {name} not found")));
    }

    let provider = providers.get(config).await?;
    let reference = lookup_backend(provider, name).await?;
    let properties = reference.properties(None).await?.ok_or_else(|| {
        QisJobError::runtime(format!("Backend {name} has no calibration to simulate"))
    })?;
    Ok(NoiseProfile::from_properties(
        reference.configuration(),
        &properties,
    ))
}

async fn noisy_simulator(
    config: &JobConfig,
    providers: &ProviderSlot,
) -> QisJobResult<Arc<dyn Backend>> {
    let noise = noise_reference(config, providers).await?;
    debug!(reference = %noise.reference, "noise profile");
    let (kind, options) = match &config.local_simulator {
        Some(local) if local.kind != SimulatorKind::Unitary => (local.kind, local.options.clone()),
        Some(local) => (SimulatorKind::Qasm, local.options.clone()),
        None => (SimulatorKind::Qasm, SimulatorOptions::default()),
    };
    Ok(Arc::new(Simulator::with_options(kind, options.with_noise(noise))?))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::config::LocalSimulator;

    struct Fleet(Vec<Arc<dyn Backend>>);

    #[async_trait]
    impl Provider for Fleet {
        fn name(&self) -> &str {
            "fleet"
        }

        async fn backends(&self) -> qisjob_hal::HalResult<Vec<Arc<dyn Backend>>> {
            Ok(self.0.clone())
        }
    }

    fn fleet() -> ProviderSlot {
        ProviderSlot::with_provider(Box::new(Fleet(vec![
            Arc::new(Simulator::new(SimulatorKind::Qasm)),
            Arc::new(Simulator::new(SimulatorKind::Statevector)),
        ])))
    }

    #[tokio::test]
    async fn test_local_simulator_needs_no_provider() {
        let config = JobConfig::builder()
            .local_simulator(Some(LocalSimulator::new(SimulatorKind::Qasm)))
            .build()
            .unwrap();
        let backend = choose_backend(&config, &ProviderSlot::new()).await.unwrap();
        assert_eq!(backend.name(), "qasm_simulator");
    }

    #[tokio::test]
    async fn test_named_backend() {
        let config = JobConfig::builder()
            .backend("statevector_simulator")
            .build()
            .unwrap();
        let backend = choose_backend(&config, &fleet()).await.unwrap();
        assert_eq!(backend.name(), "statevector_simulator");
    }

    #[tokio::test]
    async fn test_missing_backend_is_runtime_error() {
        let config = JobConfig::builder().backend("ibmq_nowhere").build().unwrap();
        let err = choose_backend(&config, &fleet()).await.err().unwrap();
        assert_eq!(err.exit_code(), 100);
        assert!(err.to_string().contains("Backend ibmq_nowhere not found"));
    }

    #[tokio::test]
    async fn test_default_skips_simulators() {
        let config = JobConfig::builder().build().unwrap();
        let err = choose_backend(&config, &fleet()).await.err().unwrap();
        assert_eq!(err.exit_code(), 100);
        assert_eq!(err.to_string(), "No suitable backend found for 5 qubits");
    }

    #[tokio::test]
    async fn test_noisy_sim_from_fake_device() {
        let name = qisjob_adapter_sim::fake_names().next().unwrap();
        let config = JobConfig::builder()
            .backend(name)
            .noisy_sim(true)
            .build()
            .unwrap();
        let backend = choose_backend(&config, &ProviderSlot::new()).await.unwrap();
        assert_eq!(backend.name(), "qasm_simulator");
        let reference = fake_backend(name).unwrap();
        assert_eq!(
            backend.configuration().n_qubits,
            reference.configuration.n_qubits
        );
    }

    #[tokio::test]
    async fn test_gpu_method_is_sdk_error() {
        let config = JobConfig::builder()
            .local_simulator(Some(
                LocalSimulator::new(SimulatorKind::Statevector)
                    .with_method(qisjob_adapter_sim::SimulationMethod::StatevectorGpu),
            ))
            .build()
            .unwrap();
        let err = choose_backend(&config, &ProviderSlot::new()).await.err().unwrap();
        assert_eq!(err.exit_code(), 200);
    }
}
