//! Error types for the IBM Quantum adapter.

use qisjob_hal::HalError;
use thiserror::Error;

/// Result type for IBM operations.
pub type IbmResult<T> = Result<T, IbmError>;

/// Errors that can occur when talking to IBM Quantum.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IbmError {
    /// No token given and no saved account found.
    #[error(
        "No IBM Quantum credentials. Pass --token and --url, set QISKIT_IBM_TOKEN, or save an account in ~/.qiskit/qiskit-ibm.json"
    )]
    MissingCredentials,

    /// The token cannot be sent as a header.
    #[error("Invalid IBM Quantum API token")]
    InvalidToken,

    /// The saved-account file exists but cannot be read.
    #[error("Unreadable account file: {0}")]
    AccountFile(String),

    /// Instance is not `hub/group/project`.
    #[error("Invalid instance '{0}', expected hub/group/project")]
    InvalidInstance(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error status.
    #[error("IBM Quantum API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
    },

    #[error("Backend {0} not found")]
    BackendNotFound(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A result the adapter cannot interpret.
    #[error("Malformed result: {0}")]
    MalformedResult(String),
}

impl From<IbmError> for HalError {
    fn from(e: IbmError) -> Self {
        match e {
            IbmError::MissingCredentials | IbmError::InvalidToken | IbmError::AccountFile(_) => {
                HalError::AuthenticationFailed(e.to_string())
            }
            IbmError::Api { status: 401 | 403, .. } => HalError::AuthenticationFailed(e.to_string()),
            IbmError::InvalidInstance(_) => HalError::Configuration(e.to_string()),
            IbmError::Http(err) => HalError::Network(err),
            IbmError::BackendNotFound(name) => HalError::BackendNotFound(name),
            IbmError::JobNotFound(id) => HalError::JobNotFound(id),
            IbmError::Json(err) => HalError::Serialization(err),
            _ => HalError::Backend(e.to_string()),
        }
    }
}
