//! Error types for the Quantum Inspire adapter.

use qisjob_hal::HalError;
use thiserror::Error;

/// Result type for Quantum Inspire operations.
pub type QiResult<T> = Result<T, QiError>;

/// Errors raised talking to Quantum Inspire.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QiError {
    #[error(
        "No Quantum Inspire token. Pass --token, set QI_TOKEN, or save it in ~/.quantuminspire/config.json"
    )]
    MissingToken,

    #[error("Invalid Quantum Inspire token")]
    InvalidToken,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Quantum Inspire API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The circuit uses something cQASM cannot say.
    #[error("Cannot express in cQASM: {0}")]
    Conversion(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),
}

impl From<QiError> for HalError {
    fn from(e: QiError) -> Self {
        match e {
            QiError::MissingToken | QiError::InvalidToken => {
                HalError::AuthenticationFailed(e.to_string())
            }
            QiError::Api {
                status: 401 | 403, ..
            } => HalError::AuthenticationFailed(e.to_string()),
            QiError::Http(err) => HalError::Network(err),
            QiError::Json(err) => HalError::Serialization(err),
            QiError::Conversion(msg) => HalError::InvalidCircuit(msg),
            QiError::JobNotFound(id) => HalError::JobNotFound(id),
            QiError::Api { .. } => HalError::Backend(e.to_string()),
        }
    }
}
