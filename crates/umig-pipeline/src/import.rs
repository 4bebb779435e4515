//! Import orchestration on the destination tenant
//!
//! Batches are imported strictly one after another, each as its own upsert
//! job, and each job must finish before the next one starts. The first
//! failing batch aborts the run. Batches imported before it stay imported;
//! because every job upserts, re-running the whole import afterwards is safe.

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};
use umig_common::{JobKind, MigrateError, Result};

use crate::batcher::Batch;
use crate::poller::{JobPoller, PollPolicy};
use crate::tenant::{ImportRequest, TenantClient};
use crate::types::{ImportSummary, Job};

/// Observer for per-batch progress
///
/// Indices are 1-based. Progress reporting is informational and cannot
/// affect the outcome of a run.
pub trait ImportObserver: Send + Sync {
    fn batch_started(&self, _index: usize, _total: usize, _records: usize) {}

    fn batch_completed(&self, _index: usize, _total: usize, _job: &Job) {}

    fn batch_failed(&self, _index: usize, _total: usize, _error: &MigrateError) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ImportObserver for NoProgress {}

/// Totals of a successful import run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub batches: usize,
    pub records: usize,
    /// Sum of the counters reported by the destination jobs
    pub summary: ImportSummary,
}

/// Replays batches as sequential import jobs on the destination tenant
pub struct ImportOrchestrator<'a, C: TenantClient + ?Sized> {
    client: &'a C,
    poller: JobPoller,
    observer: &'a dyn ImportObserver,
}

impl<'a, C: TenantClient + ?Sized> ImportOrchestrator<'a, C> {
    pub fn new(client: &'a C, policy: PollPolicy) -> Self {
        Self {
            client,
            poller: JobPoller::new(JobKind::Import, policy),
            observer: &NoProgress,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn ImportObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.poller = self.poller.with_cancellation(token);
        self
    }

    /// Import every batch, in order, into `connection_id`
    ///
    /// # Errors
    /// - [`MigrateError::Config`] for an empty connection id
    /// - [`MigrateError::ImportFailed`] naming the 1-based batch that failed,
    ///   wrapping the start, poll, failure, timeout or cancellation error
    #[instrument(skip(self, batches), fields(batches = batches.len()))]
    pub async fn import_all(&self, batches: &[Batch], connection_id: &str) -> Result<ImportReport> {
        if connection_id.trim().is_empty() {
            return Err(MigrateError::config("destination connection id is empty"));
        }

        let total = batches.len();
        let mut report = ImportReport::default();

        for (offset, batch) in batches.iter().enumerate() {
            let index = offset + 1;
            self.observer.batch_started(index, total, batch.len());
            info!(batch = index, total, records = batch.len(), bytes = batch.size_bytes(), "Importing batch");

            let job = match self.import_batch(batch, connection_id).await {
                Ok(job) => job,
                Err(e) => {
                    error!(batch = index, total, error = %e, "Batch import failed, aborting run");
                    self.observer.batch_failed(index, total, &e);
                    return Err(MigrateError::ImportFailed {
                        batch: index,
                        total,
                        source: Box::new(e),
                    });
                },
            };

            if let Some(ref summary) = job.summary {
                report.summary.accumulate(summary);
            }
            report.batches += 1;
            report.records += batch.len();

            self.observer.batch_completed(index, total, &job);
            info!(batch = index, total, job_id = %job.id, "Batch imported");
        }

        Ok(report)
    }

    async fn import_batch(&self, batch: &Batch, connection_id: &str) -> Result<Job> {
        let request = ImportRequest {
            connection_id,
            records: batch.records(),
            upsert: true,
        };

        let job = self.client.start_import(&request).await?;
        info!(job_id = %job.id, "Import job started");

        let client = self.client;
        let outcome = self
            .poller
            .await_terminal(&job.id, |id| async move { client.read_job(&id).await })
            .await?;

        Ok(outcome.job)
    }
}
