//! Quantum Inspire provider and token lookup.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use qisjob_hal::auth::{env_var, home_path, read_json_file};
use qisjob_hal::{first_fit, Backend, Credentials, HalResult, Provider};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::api::QiClient;
use crate::backend::QiBackend;
use crate::error::{QiError, QiResult};

/// Token file, relative to the home directory.
pub const TOKEN_FILE: &str = ".quantuminspire/config.json";

#[derive(Debug, Deserialize)]
struct TokenFile {
    token: String,
}

/// The token from `QI_TOKEN`, else the saved token file.
pub fn saved_token() -> QiResult<String> {
    if let Some(token) = env_var("QI_TOKEN") {
        debug!("using QI_TOKEN");
        return Ok(token);
    }
    let path = home_path(TOKEN_FILE).ok_or(QiError::MissingToken)?;
    token_from_file(&path)
}

/// Read the token from a Quantum Inspire config file.
pub fn token_from_file(path: &Path) -> QiResult<String> {
    read_json_file::<TokenFile>(path)
        .map_err(|_| QiError::MissingToken)?
        .map(|file| file.token)
        .filter(|token| !token.trim().is_empty())
        .ok_or(QiError::MissingToken)
}

/// An authenticated Quantum Inspire account.
pub struct QiProvider {
    client: Arc<QiClient>,
    backends: OnceCell<Vec<Arc<dyn Backend>>>,
}

impl QiProvider {
    /// Authenticate with an explicit token, or the saved one when `None`.
    pub fn new(token: Option<String>) -> QiResult<Self> {
        let token = match token {
            Some(token) => token,
            None => saved_token()?,
        };
        let mut credentials = Credentials::new(token);
        credentials.url = env_var("API_URL");
        Ok(Self {
            client: Arc::new(QiClient::new(&credentials)?),
            backends: OnceCell::new(),
        })
    }
}

#[async_trait]
impl Provider for QiProvider {
    fn name(&self) -> &str {
        "QI"
    }

    async fn backends(&self) -> HalResult<Vec<Arc<dyn Backend>>> {
        let backends = self
            .backends
            .get_or_try_init(|| async {
                let types = self.client.backend_types().await?;
                Ok::<_, QiError>(
                    types
                        .into_iter()
                        .map(|t| Arc::new(QiBackend::new(self.client.clone(), t)) as Arc<dyn Backend>)
                        .collect(),
                )
            })
            .await?;
        Ok(backends.clone())
    }

    /// The first backend type with enough qubits, in listing order.
    async fn default_backend(&self, min_qubits: u32) -> HalResult<Arc<dyn Backend>> {
        first_fit(self.backends().await?, min_qubits)
    }
}
