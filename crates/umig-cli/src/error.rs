//! Error types for the umig CLI
//!
//! User-facing errors with a hint on how to get past them. Pipeline failures
//! arrive as [`MigrateError`] and keep their own wording, which already names
//! the job and, for imports, the batch in flight.

use thiserror::Error;
use umig_common::MigrateError;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// Missing or invalid environment configuration
    #[error("Configuration error: {0}. Set the variables in the environment or in a .env file.")]
    Config(String),

    /// No export archive where the import phase expects one
    #[error("Export archive not found at '{0}'. Run 'umig export' first or point --archive at an existing archive.")]
    ArchiveNotFound(String),

    /// A phase step failed; `step` names what was being done
    #[error("{step} failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<CliError>,
    },

    #[error(transparent)]
    Migrate(#[from] MigrateError),

    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    #[error("Network request failed: {0}. Check your internet connection and the tenant domain.")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Attach the name of the step that was running
    pub fn in_step(self, step: &'static str) -> Self {
        Self::Step {
            step,
            source: Box::new(self),
        }
    }

    /// 1-based index of the import batch that failed, if the error came from one
    pub fn failed_batch(&self) -> Option<usize> {
        match self {
            Self::Migrate(e) => e.failed_batch(),
            Self::Step { source, .. } => source.failed_batch(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Migrate(e) => e.is_cancelled(),
            Self::Step { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Extension for tagging results with the step they belong to
pub trait StepContext<T> {
    fn step(self, step: &'static str) -> Result<T>;
}

impl<T, E: Into<CliError>> StepContext<T> for std::result::Result<T, E> {
    fn step(self, step: &'static str) -> Result<T> {
        self.map_err(|e| e.into().in_step(step))
    }
}
