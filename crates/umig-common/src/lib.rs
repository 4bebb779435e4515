//! umig Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error taxonomy, logging setup and checksum helpers for the umig
//! workspace members.
//!
//! - **Error Handling**: [`MigrateError`] and the [`Result`] alias used by the pipeline
//! - **Logging**: `tracing` subscriber configuration shared by every binary
//! - **Checksums**: SHA-256 digests of the export archive
//!
//! # Example
//!
//! ```no_run
//! use umig_common::checksum::sha256_file;
//! use umig_common::Result;
//!
//! fn describe(path: &str) -> Result<()> {
//!     let digest = sha256_file(path)?;
//!     tracing::info!(%digest, "archive digest");
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{JobKind, MigrateError, Result};
