//! umig CLI Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Command-line interface for migrating users between two identity tenants.
//!
//! # Overview
//!
//! A migration runs in two phases that can be invoked independently:
//!
//! - **Export** (`umig export`): start a bulk export on the source tenant,
//!   wait for it and download the gzip archive it produces
//! - **Import** (`umig import`): decode the archive into size-bounded batches
//!   and replay them as sequential upsert imports on the destination tenant
//!
//! The archive on disk is the only state shared by the two phases.

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod progress;
pub mod retrieval;
pub mod storage;

// Re-export commonly used types
pub use config::{MigrationConfig, TenantConfig};
pub use error::{CliError, Result};

use clap::{Args, Parser, Subcommand};
use std::time::Duration;
use umig_pipeline::PollPolicy;

/// umig - identity tenant user migration
#[derive(Parser, Debug)]
#[command(name = "umig")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path of the export archive
    #[arg(
        long,
        env = "UMIG_ARCHIVE_PATH",
        default_value = storage::DEFAULT_ARCHIVE_PATH,
        global = true
    )]
    pub archive: String,

    /// Timeout for a single HTTP request, in seconds
    #[arg(
        long,
        env = "UMIG_HTTP_TIMEOUT_SECS",
        default_value_t = api::client::DEFAULT_HTTP_TIMEOUT_SECS,
        global = true
    )]
    pub http_timeout_secs: u64,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export users from the source tenant and download the archive
    Export(ExportArgs),

    /// Import the downloaded archive into the destination tenant
    Import(ImportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Maximum number of users in the export
    #[arg(long, env = "UMIG_EXPORT_LIMIT", default_value_t = umig_pipeline::export::DEFAULT_EXPORT_LIMIT)]
    pub limit: u32,

    /// Comma-separated fields to export (defaults to the standard profile fields)
    #[arg(long, env = "UMIG_EXPORT_FIELDS", value_delimiter = ',')]
    pub fields: Vec<String>,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Upper bound on the serialized size of one import batch, in bytes
    #[arg(long, env = "UMIG_MAX_BATCH_BYTES", default_value_t = commands::import::DEFAULT_MAX_BATCH_BYTES)]
    pub max_batch_bytes: usize,

    /// Keep each user's email_verified flag instead of forcing it to true
    #[arg(long)]
    pub keep_email_verified: bool,

    #[command(flatten)]
    pub poll: PollArgs,
}

/// Overrides for the job polling schedule
#[derive(Args, Debug, Clone, Default)]
pub struct PollArgs {
    /// First wait between job status reads, in seconds
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Longest wait between job status reads, in seconds
    #[arg(long)]
    pub poll_max_interval_secs: Option<u64>,

    /// Give up on a job after waiting this long in total, in seconds
    #[arg(long)]
    pub poll_timeout_secs: Option<u64>,
}

impl PollArgs {
    /// Apply the overrides to `defaults`
    pub fn policy(&self, defaults: PollPolicy) -> Result<PollPolicy> {
        let initial = self
            .poll_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.initial_interval());
        let ceiling = self
            .poll_max_interval_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| defaults.max_interval().max(initial));
        let max_wait = self
            .poll_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.max_wait());

        Ok(PollPolicy::new(initial, defaults.growth_factor(), ceiling, max_wait)?)
    }
}
