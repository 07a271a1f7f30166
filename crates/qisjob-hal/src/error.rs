//! Error types for the HAL crate.

use thiserror::Error;

/// Errors raised by providers and backends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// Backend exists but does not accept work right now.
    #[error("Backend not available: {0}")]
    BackendUnavailable(String),

    /// No backend of that name on the provider.
    #[error("Backend {0} not found")]
    BackendNotFound(String),

    /// No backend satisfies the selection criteria.
    #[error("No suitable backend: {0}")]
    NoSuitableBackend(String),

    /// Credentials missing or rejected.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The vendor refused the submission.
    #[error("Job submission failed: {0}")]
    SubmissionFailed(String),

    /// The vendor reports the job as failed.
    #[error("Job failure {0}")]
    JobFailed(String),

    /// Job was cancelled.
    #[error("Job cancelled")]
    JobCancelled,

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Circuit cannot be expressed for this backend.
    #[error("Invalid circuit: {0}")]
    InvalidCircuit(String),

    /// Network error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local I/O, including subprocess plumbing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout waiting for job.
    #[error("Timeout waiting for job {0}")]
    Timeout(String),

    /// Circuit exceeds backend capabilities.
    #[error("Circuit exceeds backend capabilities: {0}")]
    CircuitTooLarge(String),

    /// Feature not offered by this backend or build.
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Invalid number of shots.
    #[error("Invalid shots: {0}")]
    InvalidShots(String),

    /// Anything else the vendor reports.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl HalError {
    /// Whether the error comes from the vendor or the environment at run time
    /// (missing backends, failed jobs, network and credentials) rather than
    /// from the toolkit rejecting the request.
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            HalError::BackendUnavailable(_)
                | HalError::BackendNotFound(_)
                | HalError::NoSuitableBackend(_)
                | HalError::AuthenticationFailed(_)
                | HalError::SubmissionFailed(_)
                | HalError::JobFailed(_)
                | HalError::JobCancelled
                | HalError::JobNotFound(_)
                | HalError::Network(_)
                | HalError::Io(_)
                | HalError::Configuration(_)
                | HalError::Timeout(_)
                | HalError::Backend(_)
        )
    }
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
