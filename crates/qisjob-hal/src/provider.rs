//! Providers: authenticated handles to a vendor's fleet of backends.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::backend::Backend;
use crate::error::{HalError, HalResult};

/// A vendor account.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Vendor name used in logs.
    fn name(&self) -> &str;

    /// Every backend visible to the account.
    async fn backends(&self) -> HalResult<Vec<Arc<dyn Backend>>>;

    /// A backend by name, `None` if the account has no such backend.
    async fn get_backend(&self, name: &str) -> HalResult<Option<Arc<dyn Backend>>> {
        Ok(self
            .backends()
            .await?
            .into_iter()
            .find(|b| b.name() == name))
    }

    /// The backend to use when none is named.
    ///
    /// Defaults to the operational real device with at least `min_qubits`
    /// qubits and the fewest pending jobs.
    async fn default_backend(&self, min_qubits: u32) -> HalResult<Arc<dyn Backend>> {
        least_busy(self.backends().await?, min_qubits).await
    }

    /// Account instances (hub/group/project) the credentials can use.
    async fn instances(&self) -> HalResult<Vec<String>> {
        Err(HalError::Unsupported(format!(
            "{} has no instance listing",
            self.name()
        )))
    }
}

/// The operational non-simulator backend with enough qubits and the
/// shortest queue. Ties keep the earlier backend.
pub async fn least_busy(
    backends: Vec<Arc<dyn Backend>>,
    min_qubits: u32,
) -> HalResult<Arc<dyn Backend>> {
    let mut best: Option<(u32, Arc<dyn Backend>)> = None;
    for backend in backends {
        let config = backend.configuration();
        if config.simulator || config.n_qubits < min_qubits {
            trace!(backend = backend.name(), "filtered out");
            continue;
        }
        let status = backend.status().await?;
        if !status.operational {
            trace!(backend = backend.name(), "not operational");
            continue;
        }
        debug!(
            backend = backend.name(),
            pending = status.pending_jobs,
            "candidate backend"
        );
        if best
            .as_ref()
            .is_none_or(|(pending, _)| status.pending_jobs < *pending)
        {
            best = Some((status.pending_jobs, backend));
        }
    }
    best.map(|(_, b)| b).ok_or_else(|| {
        HalError::NoSuitableBackend(format!(
            "no operational device with at least {min_qubits} qubits"
        ))
    })
}

/// The first backend with at least `min_qubits` qubits, in listing order.
pub fn first_fit(
    backends: Vec<Arc<dyn Backend>>,
    min_qubits: u32,
) -> HalResult<Arc<dyn Backend>> {
    backends
        .into_iter()
        .find(|b| b.configuration().n_qubits >= min_qubits)
        .ok_or_else(|| {
            HalError::NoSuitableBackend(format!("no backend with at least {min_qubits} qubits"))
        })
}
