//! Error types for the Forest adapter.

use qisjob_hal::HalError;
use thiserror::Error;

/// Result type for Forest operations.
pub type ForestResult<T> = Result<T, ForestError>;

/// Errors raised talking to a QVM server.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ForestError {
    #[error("HTTP request to the QVM failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The QVM refused the program.
    #[error("QVM error ({status}): {message}")]
    Qvm { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The circuit uses something Quil cannot say.
    #[error("Cannot express in Quil: {0}")]
    Conversion(String),

    /// Not a QVM simulator name.
    #[error("Unknown QVM backend '{0}', expected qasm_simulator or statevector_simulator")]
    UnknownBackend(String),

    /// Not a device the QVM knows how to emulate.
    #[error("Unknown Rigetti device '{0}'")]
    UnknownDevice(String),

    /// The wavefunction payload is not a whole number of amplitudes.
    #[error("Malformed wavefunction of {0} bytes")]
    Wavefunction(usize),

    #[error("Job not found: {0}")]
    JobNotFound(String),
}

impl From<ForestError> for HalError {
    fn from(e: ForestError) -> Self {
        match e {
            ForestError::Http(err) => HalError::Network(err),
            ForestError::Json(err) => HalError::Serialization(err),
            ForestError::Conversion(msg) => HalError::InvalidCircuit(msg),
            ForestError::UnknownBackend(name) | ForestError::UnknownDevice(name) => {
                HalError::BackendNotFound(name)
            }
            ForestError::JobNotFound(id) => HalError::JobNotFound(id),
            ForestError::Qvm { .. } | ForestError::Wavefunction(_) => {
                HalError::Backend(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hal_conversion() {
        assert!(matches!(
            HalError::from(ForestError::Conversion("conditional X".into())),
            HalError::InvalidCircuit(_)
        ));
        assert!(matches!(
            HalError::from(ForestError::UnknownDevice("Aspen-99".into())),
            HalError::BackendNotFound(name) if name == "Aspen-99"
        ));
        let refused = ForestError::Qvm {
            status: 400,
            message: "unknown gate FOO".into(),
        };
        assert!(matches!(HalError::from(refused), HalError::Backend(m) if m.contains("FOO")));
    }
}
