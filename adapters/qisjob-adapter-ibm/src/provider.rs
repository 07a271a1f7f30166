//! IBM Quantum provider and saved-account lookup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use qisjob_hal::auth::{env_var, home_path, read_json_file};
use qisjob_hal::{Backend, Credentials, HalResult, Provider};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::api::IbmClient;
use crate::backend::IbmBackend;
use crate::error::{IbmError, IbmResult};

/// Saved-account file, relative to the home directory.
pub const ACCOUNT_FILE: &str = ".qiskit/qiskit-ibm.json";

/// Account name used when none is chosen.
pub const DEFAULT_ACCOUNT: &str = "default-ibm-quantum";

/// One entry of the saved-account file.
#[derive(Debug, Deserialize)]
struct SavedAccount {
    token: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    instance: Option<String>,
}

/// Credentials from `QISKIT_IBM_TOKEN`/`QISKIT_IBM_URL`, else the saved
/// account file.
pub fn saved_credentials() -> IbmResult<Credentials> {
    if let Some(token) = env_var("QISKIT_IBM_TOKEN") {
        debug!("using QISKIT_IBM_TOKEN");
        let mut creds = Credentials::new(token);
        creds.url = env_var("QISKIT_IBM_URL");
        creds.instance = env_var("QISKIT_IBM_INSTANCE");
        return Ok(creds);
    }
    let path = home_path(ACCOUNT_FILE).ok_or(IbmError::MissingCredentials)?;
    credentials_from_file(&path, DEFAULT_ACCOUNT)
}

/// Read one named account from a saved-account file.
pub fn credentials_from_file(path: &Path, account: &str) -> IbmResult<Credentials> {
    let mut accounts: HashMap<String, SavedAccount> = read_json_file(path)
        .map_err(|e| IbmError::AccountFile(e.to_string()))?
        .ok_or(IbmError::MissingCredentials)?;
    let saved = accounts
        .remove(account)
        .ok_or(IbmError::MissingCredentials)?;
    debug!(path = %path.display(), account, "loaded saved account");
    let mut creds = Credentials::new(saved.token).with_instance(saved.instance);
    creds.url = saved.url;
    Ok(creds)
}

/// An authenticated IBM Quantum account.
pub struct IbmProvider {
    client: Arc<IbmClient>,
    backends: OnceCell<Vec<Arc<dyn Backend>>>,
}

impl IbmProvider {
    /// Authenticate with explicit credentials.
    pub fn new(credentials: &Credentials) -> IbmResult<Self> {
        info!(instance = ?credentials.instance, "IBM Quantum account");
        Ok(Self {
            client: Arc::new(IbmClient::new(credentials)?),
            backends: OnceCell::new(),
        })
    }

    /// Authenticate with saved credentials, optionally overriding the instance.
    pub fn from_saved_account(instance: Option<String>) -> IbmResult<Self> {
        let mut credentials = saved_credentials()?;
        if instance.is_some() {
            credentials.instance = instance;
        }
        Self::new(&credentials)
    }

    async fn fetch_backend(&self, name: &str) -> IbmResult<Arc<dyn Backend>> {
        let configuration = self.client.configuration(name).await?;
        Ok(Arc::new(IbmBackend::new(self.client.clone(), configuration)))
    }
}

#[async_trait]
impl Provider for IbmProvider {
    fn name(&self) -> &str {
        "IBMQ"
    }

    async fn backends(&self) -> HalResult<Vec<Arc<dyn Backend>>> {
        let backends = self
            .backends
            .get_or_try_init(|| async {
                let mut backends = Vec::new();
                for name in self.client.backend_names().await? {
                    match self.fetch_backend(&name).await {
                        Ok(backend) => backends.push(backend),
                        Err(e) => warn!("skipping backend {name}: {e}"),
                    }
                }
                Ok::<_, IbmError>(backends)
            })
            .await?;
        Ok(backends.clone())
    }

    async fn get_backend(&self, name: &str) -> HalResult<Option<Arc<dyn Backend>>> {
        if let Some(backends) = self.backends.get() {
            return Ok(backends.iter().find(|b| b.name() == name).cloned());
        }
        match self.fetch_backend(name).await {
            Ok(backend) => Ok(Some(backend)),
            Err(IbmError::BackendNotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn instances(&self) -> HalResult<Vec<String>> {
        Ok(self.client.instances().await?)
    }
}
