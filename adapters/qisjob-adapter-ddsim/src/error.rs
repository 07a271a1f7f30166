//! Error types for the DDSIM adapter.

use std::path::PathBuf;

use qisjob_hal::HalError;
use thiserror::Error;

/// Result type for DDSIM operations.
pub type DdsimResult<T> = Result<T, DdsimError>;

/// Errors raised running the DDSIM executable.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DdsimError {
    /// The executable could not be started.
    #[error("Cannot run {}: {source}. Install mqt.ddsim or set DDSIM_PATH", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The simulator ran and reported a failure.
    #[error("ddsim exited with {code}: {message}")]
    Failed { code: i32, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output that is not the expected JSON document.
    #[error("Unreadable ddsim output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Unknown DDSIM backend '{0}', expected qasm_simulator or statevector_simulator")]
    UnknownBackend(String),
}

impl From<DdsimError> for HalError {
    fn from(e: DdsimError) -> Self {
        match e {
            DdsimError::Spawn { .. } => HalError::BackendUnavailable(e.to_string()),
            DdsimError::Failed { message, .. } => HalError::JobFailed(message),
            DdsimError::Io(err) => HalError::Io(err),
            DdsimError::Output(err) => HalError::Serialization(err),
            DdsimError::UnknownBackend(name) => HalError::BackendNotFound(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error_names_program() {
        let e = DdsimError::Spawn {
            program: PathBuf::from("/opt/ddsim_simple"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let msg = e.to_string();
        assert!(msg.contains("/opt/ddsim_simple"));
        assert!(msg.contains("DDSIM_PATH"));
        assert!(matches!(HalError::from(e), HalError::BackendUnavailable(_)));
    }

    #[test]
    fn test_failure_keeps_reason() {
        let e = DdsimError::Failed {
            code: 1,
            message: "unknown gate foo".into(),
        };
        assert!(matches!(HalError::from(e), HalError::JobFailed(m) if m == "unknown gate foo"));
    }
}
