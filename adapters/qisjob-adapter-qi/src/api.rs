//! Quantum Inspire REST client.
//!
//! A submission is three calls: a project to hold it, an asset carrying the
//! cQASM text, and the job that runs the asset on a backend type.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use qisjob_hal::Credentials;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{QiError, QiResult};

/// Default Quantum Inspire endpoint.
pub const DEFAULT_URL: &str = "https://api.quantum-inspire.com";

/// Quantum Inspire API client.
pub struct QiClient {
    client: Client,
    url: String,
}

impl fmt::Debug for QiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QiClient")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl QiClient {
    pub fn new(credentials: &Credentials) -> QiResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("token {}", credentials.token))
                .map_err(|_| QiError::InvalidToken)?,
        );
        let client = Client::builder()
            .user_agent(concat!("qisjob/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            url: credentials
                .url
                .as_deref()
                .unwrap_or(DEFAULT_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> QiResult<T> {
        let url = format!("{}{path}", self.url);
        trace!(%url, "GET");
        decode(self.client.get(&url).send().await?).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> QiResult<T> {
        let url = format!("{}{path}", self.url);
        trace!(%url, "POST");
        decode(self.client.post(&url).json(body).send().await?).await
    }

    /// Every backend type the account may use.
    pub async fn backend_types(&self) -> QiResult<Vec<BackendType>> {
        self.get("/backendtypes/").await
    }

    /// Create a project, upload the program and start a job; returns the job id.
    pub async fn run(
        &self,
        backend: &BackendType,
        name: &str,
        cqasm: String,
        shots: u32,
    ) -> QiResult<u64> {
        let project: Created = self
            .post(
                "/projects/",
                &serde_json::json!({
                    "name": format!("qisjob {name}"),
                    "default_number_of_shots": shots,
                    "backend_type": backend.url,
                }),
            )
            .await?;
        let asset: Created = self
            .post(
                "/assets/",
                &serde_json::json!({
                    "name": name,
                    "contentType": "text/plain",
                    "project": project.url,
                    "content": cqasm,
                }),
            )
            .await?;
        let job: QiJob = self
            .post(
                "/jobs/",
                &serde_json::json!({
                    "name": name,
                    "input": asset.url,
                    "backend_type": backend.url,
                    "number_of_shots": shots,
                    "full_state_projection": false,
                }),
            )
            .await?;
        debug!(job = job.id, backend = %backend.name, "QI job created");
        Ok(job.id)
    }

    pub async fn job(&self, id: u64) -> QiResult<QiJob> {
        self.get(&format!("/jobs/{id}/"))
            .await
            .map_err(|e| not_found_as(e, id))
    }

    pub async fn result(&self, id: u64) -> QiResult<QiResultBody> {
        self.get(&format!("/jobs/{id}/result/"))
            .await
            .map_err(|e| not_found_as(e, id))
    }

    /// All jobs of the account.
    pub async fn jobs(&self) -> QiResult<Vec<QiJob>> {
        self.get("/jobs/").await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> QiResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let message = response.text().await.unwrap_or_default();
    Err(QiError::Api {
        status: status.as_u16(),
        message,
    })
}

fn not_found_as(error: QiError, id: u64) -> QiError {
    match error {
        QiError::Api { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
            QiError::JobNotFound(id.to_string())
        }
        other => other,
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Created {
    url: String,
}

/// A backend type as listed by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendType {
    pub name: String,
    pub url: String,
    pub number_of_qubits: u32,
    #[serde(default)]
    pub is_hardware_backend: bool,
    #[serde(default = "default_max_shots")]
    pub max_number_of_shots: u32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Directed connections; an empty map means all-to-all.
    #[serde(default)]
    pub topology: Option<Topology>,
}

fn default_max_shots() -> u32 {
    4096
}

#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub edges: Vec<Vec<u32>>,
}

/// A job record.
#[derive(Debug, Clone, Deserialize)]
pub struct QiJob {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// `NEW`, `RUNNING`, `COMPLETE` or `CANCELLED`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub number_of_shots: u32,
    #[serde(default)]
    pub backend_type: Option<String>,
    #[serde(default)]
    pub queued_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Output of a finished job.
#[derive(Debug, Clone, Deserialize)]
pub struct QiResultBody {
    /// Probability per basis state, keyed by the state as a decimal integer.
    #[serde(default)]
    pub histogram: BTreeMap<String, f64>,
    /// Error text when the run failed.
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub execution_time_in_seconds: Option<f64>,
}

impl QiResultBody {
    /// The failure text, if the run did not produce a histogram.
    pub fn failure(&self) -> Option<&str> {
        let text = self.raw_text.trim();
        (self.histogram.is_empty() && !text.is_empty()).then_some(text)
    }
}
