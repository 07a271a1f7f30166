//! IBM Quantum REST client.
//!
//! Backends, calibration and jobs live under `/runtime`; the hub/group/project
//! tree an account can reach is served from `/api/Network`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use qisjob_hal::{BackendConfiguration, BackendProperties, BackendStatus, Credentials};
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{IbmError, IbmResult};

/// Default IBM Quantum endpoint.
pub const DEFAULT_URL: &str = "https://api.quantum-computing.ibm.com";

const USER_AGENT: &str = concat!("qisjob/", env!("CARGO_PKG_VERSION"));

/// IBM Quantum API client.
pub struct IbmClient {
    client: Client,
    url: String,
    /// `hub/group/project` the jobs are charged to.
    instance: Option<String>,
}

impl fmt::Debug for IbmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmClient")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .field("instance", &self.instance)
            .finish()
    }
}

impl IbmClient {
    /// Build a client for the given credentials.
    pub fn new(credentials: &Credentials) -> IbmResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", credentials.token))
                .map_err(|_| IbmError::InvalidToken)?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        if let Some(instance) = &credentials.instance {
            validate_instance(instance)?;
        }

        Ok(Self {
            client,
            url: credentials
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            instance: credentials.instance.clone(),
        })
    }

    /// The instance jobs are submitted under.
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> IbmResult<T> {
        let url = format!("{}{path}", self.url);
        trace!(%url, "GET");
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    /// Names of the backends visible to the account.
    pub async fn backend_names(&self) -> IbmResult<Vec<String>> {
        let path = match &self.instance {
            Some(instance) => format!("/runtime/backends?provider={instance}"),
            None => "/runtime/backends".to_string(),
        };
        let listing: DevicesResponse = self.get(&path).await?;
        Ok(listing.devices.into_iter().map(DeviceEntry::into_name).collect())
    }

    /// Static configuration of a backend.
    pub async fn configuration(&self, name: &str) -> IbmResult<BackendConfiguration> {
        let raw: RawConfiguration = self
            .get(&format!("/runtime/backends/{name}/configuration"))
            .await
            .map_err(|e| not_found_as(e, || IbmError::BackendNotFound(name.to_string())))?;
        Ok(raw.into())
    }

    /// Current status of a backend.
    pub async fn status(&self, name: &str) -> IbmResult<BackendStatus> {
        self.get(&format!("/runtime/backends/{name}/status"))
            .await
            .map_err(|e| not_found_as(e, || IbmError::BackendNotFound(name.to_string())))
    }

    /// Calibration data, optionally as it stood before `at`.
    ///
    /// Simulators answer with an empty body, which maps to `None`.
    pub async fn properties(
        &self,
        name: &str,
        at: Option<DateTime<Utc>>,
    ) -> IbmResult<Option<BackendProperties>> {
        let mut path = format!("/runtime/backends/{name}/properties");
        if let Some(at) = at {
            path.push_str(&format!("?updated_before={}", at.to_rfc3339()));
        }
        let value: serde_json::Value = self
            .get(&path)
            .await
            .map_err(|e| not_found_as(e, || IbmError::BackendNotFound(name.to_string())))?;
        if value.as_object().is_none_or(serde_json::Map::is_empty) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Submit OpenQASM 3 circuits to the sampler.
    pub async fn submit(&self, backend: &str, circuits: Vec<String>, shots: u32) -> IbmResult<String> {
        let request = SamplerJobRequest {
            program_id: "sampler",
            backend,
            hub: self.instance.as_deref(),
            params: SamplerParams {
                version: 2,
                pubs: circuits
                    .into_iter()
                    .map(|qasm| serde_json::json!([qasm, serde_json::Value::Null, shots]))
                    .collect(),
                shots,
            },
        };
        let url = format!("{}/runtime/jobs", self.url);
        debug!(backend, "submitting sampler job");
        let response = self.client.post(&url).json(&request).send().await?;
        let submitted: SubmitResponse = decode(response).await?;
        Ok(submitted.id)
    }

    /// The job record as the service keeps it.
    pub async fn job(&self, job_id: &str) -> IbmResult<RuntimeJob> {
        self.get(&format!("/runtime/jobs/{job_id}"))
            .await
            .map_err(|e| not_found_as(e, || IbmError::JobNotFound(job_id.to_string())))
    }

    /// Sampler output of a completed job.
    pub async fn results(&self, job_id: &str) -> IbmResult<SamplerOutput> {
        self.get(&format!("/runtime/jobs/{job_id}/results"))
            .await
            .map_err(|e| not_found_as(e, || IbmError::JobNotFound(job_id.to_string())))
    }

    /// Most recent jobs on a backend, newest first.
    pub async fn jobs(&self, backend: &str, limit: usize) -> IbmResult<Vec<RuntimeJob>> {
        let listing: JobsResponse = self
            .get(&format!(
                "/runtime/jobs?backend={backend}&limit={limit}&sort=DESC"
            ))
            .await?;
        Ok(listing.jobs)
    }

    /// Every `hub/group/project` the account belongs to.
    pub async fn instances(&self) -> IbmResult<Vec<String>> {
        let hubs: Vec<Hub> = self.get("/api/Network").await?;
        Ok(flatten_hubs(hubs))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> IbmResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .ok()
        .and_then(ApiErrorResponse::message)
        .unwrap_or(body);
    Err(IbmError::Api {
        status: status.as_u16(),
        message,
    })
}

fn not_found_as(error: IbmError, replacement: impl FnOnce() -> IbmError) -> IbmError {
    match error {
        IbmError::Api { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => replacement(),
        other => other,
    }
}

/// Check an instance string has three non-empty parts.
pub fn validate_instance(instance: &str) -> IbmResult<()> {
    let parts: Vec<&str> = instance.split('/').collect();
    if parts.len() == 3 && parts.iter().all(|p| !p.is_empty()) {
        Ok(())
    } else {
        Err(IbmError::InvalidInstance(instance.to_string()))
    }
}

fn flatten_hubs(hubs: Vec<Hub>) -> Vec<String> {
    let mut instances = Vec::new();
    for hub in hubs {
        for group in hub.groups.into_values() {
            for project in group.projects.into_values() {
                instances.push(format!("{}/{}/{}", hub.name, group.name, project.name));
            }
        }
    }
    instances.sort();
    instances
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Serialize)]
struct SamplerJobRequest<'a> {
    program_id: &'a str,
    backend: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hub: Option<&'a str>,
    params: SamplerParams,
}

#[derive(Debug, Serialize)]
struct SamplerParams {
    version: u32,
    /// `[circuit, parameter values, shots]` per circuit.
    pubs: Vec<serde_json::Value>,
    shots: u32,
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl ApiErrorResponse {
    fn message(self) -> Option<String> {
        self.message.or_else(|| {
            self.error.map(|e| match e {
                serde_json::Value::String(s) => s,
                other => other
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map_or_else(|| other.to_string(), str::to_string),
            })
        })
    }
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    devices: Vec<DeviceEntry>,
}

/// Listings give either bare names or objects with a name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DeviceEntry {
    Name(String),
    Object { name: String },
}

impl DeviceEntry {
    fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Object { name } => name,
        }
    }
}

/// Configuration as served; optional fields get the usual defaults.
#[derive(Debug, Deserialize)]
struct RawConfiguration {
    backend_name: String,
    #[serde(default)]
    backend_version: String,
    n_qubits: u32,
    #[serde(default)]
    simulator: bool,
    #[serde(default)]
    local: bool,
    #[serde(default)]
    basis_gates: Vec<String>,
    #[serde(default)]
    coupling_map: Option<Vec<[u32; 2]>>,
    #[serde(default = "default_max_shots")]
    max_shots: u32,
    #[serde(default)]
    memory: bool,
    #[serde(default)]
    description: Option<String>,
}

fn default_max_shots() -> u32 {
    8192
}

impl From<RawConfiguration> for BackendConfiguration {
    fn from(raw: RawConfiguration) -> Self {
        let mut configuration = BackendConfiguration::new(raw.backend_name, raw.n_qubits)
            .with_basis_gates(raw.basis_gates)
            .with_max_shots(raw.max_shots);
        if raw.simulator {
            configuration = configuration.simulator(raw.local);
        }
        configuration.backend_version = raw.backend_version;
        configuration.coupling_map = raw.coupling_map.filter(|edges| !edges.is_empty());
        configuration.memory = raw.memory;
        configuration.description = raw.description;
        configuration
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<RuntimeJob>,
}

/// A job as the service describes it.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeJob {
    pub id: String,
    #[serde(default)]
    pub backend: Option<String>,
    /// Top-level status, mixed case depending on service version.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub state: Option<JobState>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
    #[serde(default)]
    pub queue_position: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobState {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl RuntimeJob {
    /// Status text, preferring the nested state.
    pub fn status_text(&self) -> String {
        self.state
            .as_ref()
            .map(|s| s.status.clone())
            .filter(|s| !s.is_empty())
            .or_else(|| self.status.clone())
            .unwrap_or_default()
            .to_uppercase()
    }

    /// Failure reason, if any.
    pub fn reason(&self) -> Option<String> {
        self.state.as_ref().and_then(|s| s.reason.clone())
    }

    /// Shots recorded in the submission parameters.
    pub fn shots(&self) -> u32 {
        self.params
            .as_ref()
            .and_then(|p| p.get("shots"))
            .and_then(serde_json::Value::as_u64)
            .map_or(0, |s| u32::try_from(s).unwrap_or(u32::MAX))
    }
}

/// Sampler output: one entry per submitted circuit.
#[derive(Debug, Deserialize)]
pub struct SamplerOutput {
    pub results: Vec<PubResult>,
}

#[derive(Debug, Deserialize)]
pub struct PubResult {
    /// Per classical register samples.
    #[serde(default)]
    pub data: BTreeMap<String, RegisterSamples>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterSamples {
    /// One hex string per shot, e.g. `"0x3"`.
    pub samples: Vec<String>,
    #[serde(default)]
    pub num_bits: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Hub {
    name: String,
    #[serde(default)]
    groups: HashMap<String, Group>,
}

#[derive(Debug, Deserialize)]
struct Group {
    name: String,
    #[serde(default)]
    projects: HashMap<String, Project>,
}

#[derive(Debug, Deserialize)]
struct Project {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_validation() {
        assert!(validate_instance("ibm-q/open/main").is_ok());
        assert!(matches!(
            validate_instance("ibm-q/open"),
            Err(IbmError::InvalidInstance(_))
        ));
        assert!(validate_instance("ibm-q//main").is_err());
    }

    #[test]
    fn test_client_debug_redacts_token() {
        let creds = Credentials::new("s3cret").with_instance(Some("ibm-q/open/main".into()));
        let client = IbmClient::new(&creds).unwrap();
        let shown = format!("{client:?}");
        assert!(!shown.contains("s3cret"));
        assert!(shown.contains(DEFAULT_URL));
        assert_eq!(client.instance(), Some("ibm-q/open/main"));
    }

    #[test]
    fn test_devices_listing_shapes() {
        let names: DevicesResponse =
            serde_json::from_str(r#"{"devices": ["ibmq_qasm_simulator", "ibmq_lima"]}"#).unwrap();
        let objects: DevicesResponse =
            serde_json::from_str(r#"{"devices": [{"name": "ibm_nairobi", "qubits": 7}]}"#).unwrap();
        let names: Vec<String> = names.devices.into_iter().map(DeviceEntry::into_name).collect();
        assert_eq!(names, ["ibmq_qasm_simulator", "ibmq_lima"]);
        assert_eq!(objects.devices.into_iter().next().unwrap().into_name(), "ibm_nairobi");
    }

    #[test]
    fn test_configuration_conversion() {
        let raw: RawConfiguration = serde_json::from_str(
            r#"{
                "backend_name": "ibmq_qasm_simulator",
                "backend_version": "0.1.547",
                "n_qubits": 32,
                "simulator": true,
                "local": false,
                "basis_gates": ["u1", "u2", "u3", "cx"],
                "coupling_map": null,
                "conditional": true
            }"#,
        )
        .unwrap();
        let config = BackendConfiguration::from(raw);
        assert!(config.simulator);
        assert!(!config.local);
        assert_eq!(config.n_qubits, 32);
        assert_eq!(config.max_shots, 8192);
        assert!(config.coupling_map.is_none());
    }

    #[test]
    fn test_job_status_text_prefers_state() {
        let job: RuntimeJob = serde_json::from_str(
            r#"{
                "id": "cn0abc",
                "backend": "ibmq_lima",
                "status": "Failed",
                "state": {"status": "Failed", "reason": "Error code 8019; qubit out of calibration"},
                "created": "2023-03-01T10:00:00Z",
                "params": {"shots": 1024}
            }"#,
        )
        .unwrap();
        assert_eq!(job.status_text(), "FAILED");
        assert!(job.reason().unwrap().contains("8019"));
        assert_eq!(job.shots(), 1024);
    }

    #[test]
    fn test_flatten_hubs() {
        let hubs: Vec<Hub> = serde_json::from_str(
            r#"[{"name": "ibm-q", "groups": {"open": {"name": "open",
                "projects": {"main": {"name": "main"}}}}}]"#,
        )
        .unwrap();
        assert_eq!(flatten_hubs(hubs), ["ibm-q/open/main"]);
    }

    #[test]
    fn test_error_body_message() {
        let nested: ApiErrorResponse =
            serde_json::from_str(r#"{"error": {"message": "Login failed."}}"#).unwrap();
        assert_eq!(nested.message().as_deref(), Some("Login failed."));
        let flat: ApiErrorResponse = serde_json::from_str(r#"{"message": "nope"}"#).unwrap();
        assert_eq!(flat.message().as_deref(), Some("nope"));
    }
}
