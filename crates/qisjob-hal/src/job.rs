//! Job identity, status and the printable job record.
//!
//! ```text
//!   submit() ──→ Queued ──→ Running ──→ Completed
//!                  │           │
//!                  │           ├──→ Failed(reason)
//!                  │           │
//!                  └───────────┴──→ Cancelled
//! ```
//!
//! Terminal states are permanent.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier a backend assigns to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new job ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Waiting in the vendor queue.
    Queued,
    /// Executing.
    Running,
    /// Finished with results.
    Completed,
    /// Finished without results; carries the vendor's reason.
    Failed(String),
    /// Cancelled before completion.
    Cancelled,
}

impl JobStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed(_) | JobStatus::Cancelled
        )
    }

    /// Check if the job is still pending (queued or running).
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }

    /// The job monitor wording for this status.
    pub fn monitor_message(&self) -> String {
        match self {
            JobStatus::Queued => "job is queued".into(),
            JobStatus::Running => "job is actively running".into(),
            JobStatus::Completed => "job has successfully run".into(),
            JobStatus::Failed(reason) => format!("job incurred error: {reason}"),
            JobStatus::Cancelled => "job has been cancelled".into(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "QUEUED"),
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Completed => write!(f, "DONE"),
            JobStatus::Failed(_) => write!(f, "ERROR"),
            JobStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Everything a backend can say about one job; printed by `-j` and the job
/// inspection commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub backend: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<DateTime<Utc>>,
    pub shots: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
}

impl JobRecord {
    /// A freshly queued job created now.
    pub fn new(job_id: impl Into<JobId>, backend: impl Into<String>, shots: u32) -> Self {
        Self {
            job_id: job_id.into(),
            backend: backend.into(),
            status: JobStatus::Queued,
            creation_date: Some(Utc::now()),
            shots,
            error_message: None,
            tags: vec![],
            queue_position: None,
        }
    }

    /// Update the status, recording the reason of a failure.
    #[must_use]
    pub fn with_status(mut self, status: JobStatus) -> Self {
        if let JobStatus::Failed(reason) = &status {
            self.error_message = Some(reason.clone());
        }
        if status.is_terminal() {
            self.queue_position = None;
        }
        self.status = status;
        self
    }
}
