//! Error types for the job workflow.
//!
//! Every failure lands in one of three classes, each with its own process
//! exit code: the request itself was wrong, something went wrong while
//! running it, or a toolkit component rejected it.

use qisjob_compile::CompileError;
use qisjob_hal::HalError;
use thiserror::Error;

/// Boxed cause attached to runtime and SDK errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for workflow operations.
pub type QisJobResult<T> = Result<T, QisJobError>;

/// Errors raised while configuring or running jobs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QisJobError {
    /// Invalid or contradictory request.
    #[error("{0}")]
    Argument(String),

    /// Failure while resolving, running or reporting.
    #[error("{message}")]
    Runtime {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A toolkit component refused the request.
    #[error("{message}")]
    Sdk {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl QisJobError {
    pub fn argument(message: impl Into<String>) -> Self {
        QisJobError::Argument(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        QisJobError::Runtime {
            message: message.into(),
            source: None,
        }
    }

    /// A runtime error whose message is `message` and whose cause is `source`.
    pub fn runtime_from(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        QisJobError::Runtime {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn sdk_from(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        QisJobError::Sdk {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            QisJobError::Argument(_) => 1,
            QisJobError::Runtime { .. } => 100,
            QisJobError::Sdk { .. } => 200,
        }
    }

    /// Name printed in front of the message.
    pub fn type_name(&self) -> &'static str {
        match self {
            QisJobError::Argument(_) => "QisJobArgumentError",
            QisJobError::Runtime { .. } => "QisJobRuntimeError",
            QisJobError::Sdk { .. } => "QisJobSdkError",
        }
    }

    /// `"{TypeName} : {message}"`, the form written to stderr.
    pub fn report(&self) -> String {
        format!("{} : {}", self.type_name(), self)
    }
}

impl From<HalError> for QisJobError {
    fn from(e: HalError) -> Self {
        let message = e.to_string();
        if e.is_runtime() {
            QisJobError::runtime_from(message, e)
        } else {
            QisJobError::sdk_from(message, e)
        }
    }
}

impl From<CompileError> for QisJobError {
    fn from(e: CompileError) -> Self {
        QisJobError::sdk_from(format!("Transpile failed: {e}"), e)
    }
}
