//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod export;
pub mod import;

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::MigrationConfig;
use crate::storage::ArchiveStore;

/// Everything a phase needs besides its own arguments
pub struct Context<'a> {
    pub config: &'a MigrationConfig,
    pub store: &'a ArchiveStore,
    pub http_timeout: Duration,
    pub cancel: CancellationToken,
}
