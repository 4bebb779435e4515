//! Error types for the migration pipeline
//!
//! Every failure of the export or import phase is expressed as a
//! [`MigrateError`]. The variants follow the life of a run: configuration,
//! local IO, payload decoding, remote calls, and the terminal outcomes of
//! remote bulk jobs.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for migration operations
pub type Result<T> = std::result::Result<T, MigrateError>;

/// Kind of remote bulk job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Export,
    Import,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Export => write!(f, "export"),
            JobKind::Import => write!(f, "import"),
        }
    }
}

/// Main error type for the migration pipeline
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Missing or invalid credentials, connection identifiers or tunables
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed compressed payload or JSON record
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A remote call other than a status read failed (job creation, download)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Reading the status of a running job failed
    #[error("Failed to read status of {kind} job {job_id}: {reason}")]
    Poll {
        kind: JobKind,
        job_id: String,
        reason: String,
    },

    #[error("{kind} job {job_id} failed: {detail}")]
    JobFailed {
        kind: JobKind,
        job_id: String,
        detail: String,
    },

    #[error("{kind} job {job_id} did not finish within {waited:?}")]
    JobTimeout {
        kind: JobKind,
        job_id: String,
        waited: Duration,
    },

    #[error("Export job {job_id} failed: {detail}")]
    ExportFailed { job_id: String, detail: String },

    #[error("Export job {job_id} timed out after {waited:?}")]
    ExportTimeout { job_id: String, waited: Duration },

    /// An import batch failed; earlier batches stay imported
    #[error("Import of batch {batch}/{total} failed: {source}")]
    ImportFailed {
        batch: usize,
        total: usize,
        #[source]
        source: Box<MigrateError>,
    },

    #[error("Cancelled while {0}")]
    Cancelled(String),
}

impl MigrateError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// 1-based index of the import batch that was in flight, if any
    pub fn failed_batch(&self) -> Option<usize> {
        match self {
            Self::ImportFailed { batch, .. } => Some(*batch),
            _ => None,
        }
    }

    /// Whether the run was stopped by a cancellation request
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled(_) => true,
            Self::ImportFailed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}
