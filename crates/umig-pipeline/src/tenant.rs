//! Tenant client abstraction
//!
//! The pipeline talks to an identity tenant only through [`TenantClient`].
//! The CLI implements it over the Auth0 Management API; tests implement it
//! in memory.

use async_trait::async_trait;
use umig_common::Result;

use crate::types::{Job, Record};

/// Parameters of a bulk export job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// Connection (user store) to export from
    pub connection_id: String,
    /// Field projection applied by the tenant
    pub fields: Vec<String>,
    /// Maximum number of records; the tenant truncates beyond it
    pub limit: u32,
}

/// Parameters of a bulk import job
#[derive(Debug, Clone, Copy)]
pub struct ImportRequest<'a> {
    /// Connection (user store) to import into
    pub connection_id: &'a str,
    pub records: &'a [Record],
    /// Update records with matching identity instead of rejecting them
    pub upsert: bool,
}

/// Capabilities the pipeline needs from one tenant
#[async_trait]
pub trait TenantClient: Send + Sync {
    /// Start an asynchronous export job
    async fn start_export(&self, request: &ExportRequest) -> Result<Job>;

    /// Start an asynchronous import job carrying `request.records`
    async fn start_import(&self, request: &ImportRequest<'_>) -> Result<Job>;

    /// Read the current state of a job
    async fn read_job(&self, job_id: &str) -> Result<Job>;
}
