//! Export orchestration on the source tenant
//!
//! Starts one export job and waits for it. The tenant truncates an export at
//! its record limit; populations larger than one limit need several runs and
//! are not split here.

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use umig_common::{JobKind, MigrateError, Result};

use crate::poller::{JobPoller, PollPolicy};
use crate::tenant::{ExportRequest, TenantClient};

/// Default maximum number of records per export job
pub const DEFAULT_EXPORT_LIMIT: u32 = 50_000;

/// Fields exported when the caller does not choose a projection
pub const DEFAULT_EXPORT_FIELDS: &[&str] = &[
    "user_id",
    "email",
    "name",
    "user_metadata",
    "app_metadata",
    "created_at",
    "updated_at",
    "email_verified",
];

/// Drives one export job on the source tenant
pub struct ExportOrchestrator<'a, C: TenantClient + ?Sized> {
    client: &'a C,
    poller: JobPoller,
    limit: u32,
}

impl<'a, C: TenantClient + ?Sized> ExportOrchestrator<'a, C> {
    pub fn new(client: &'a C, policy: PollPolicy) -> Self {
        Self {
            client,
            poller: JobPoller::new(JobKind::Export, policy),
            limit: DEFAULT_EXPORT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.poller = self.poller.with_cancellation(token);
        self
    }

    /// Export `fields` of every user in `connection_id` and return the
    /// location of the resulting archive
    ///
    /// # Errors
    /// - [`MigrateError::Config`] for an empty connection id, field list or limit
    /// - [`MigrateError::ExportFailed`] if the job fails or completes without a location
    /// - [`MigrateError::ExportTimeout`] if the poll budget runs out
    /// - errors of the tenant client when the job cannot be started or read
    #[instrument(skip(self, fields), fields(limit = self.limit))]
    pub async fn export_all(&self, fields: &[String], connection_id: &str) -> Result<String> {
        if connection_id.trim().is_empty() {
            return Err(MigrateError::config("source connection id is empty"));
        }
        if fields.is_empty() {
            return Err(MigrateError::config("export field selection is empty"));
        }
        if self.limit == 0 {
            return Err(MigrateError::config("export limit must be greater than zero"));
        }

        let request = ExportRequest {
            connection_id: connection_id.to_string(),
            fields: fields.to_vec(),
            limit: self.limit,
        };

        let job = self.client.start_export(&request).await?;
        info!(job_id = %job.id, "Export job started");

        let client = self.client;
        let outcome = self
            .poller
            .await_terminal(&job.id, |id| async move { client.read_job(&id).await })
            .await
            .map_err(|e| match e {
                MigrateError::JobFailed { job_id, detail, .. } => {
                    MigrateError::ExportFailed { job_id, detail }
                },
                MigrateError::JobTimeout { job_id, waited, .. } => {
                    MigrateError::ExportTimeout { job_id, waited }
                },
                other => other,
            })?;

        let location = outcome.job.location.ok_or_else(|| MigrateError::ExportFailed {
            job_id: job.id.clone(),
            detail: "job completed without a download location".to_string(),
        })?;

        info!(job_id = %job.id, attempts = outcome.attempts, "Export ready for download");
        Ok(location)
    }
}

/// [`DEFAULT_EXPORT_FIELDS`] as owned strings
pub fn default_fields() -> Vec<String> {
    DEFAULT_EXPORT_FIELDS.iter().map(|f| f.to_string()).collect()
}
