//! umig Pipeline Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Moves user records from one identity tenant to another through the
//! tenants' asynchronous bulk-job APIs.
//!
//! # Components
//!
//! - [`archive`]: gzip codec for the export archive
//! - [`batcher`]: streaming NDJSON decoder producing size-bounded batches
//! - [`poller`]: drives a remote job to a terminal state with bounded backoff
//! - [`export`]: starts and awaits the export job on the source tenant
//! - [`import`]: replays batches as sequential upsert imports on the destination
//!
//! The remote side is reached only through the [`TenantClient`] trait, so every
//! component can run against an in-memory tenant in tests.
//!
//! # Example
//!
//! ```no_run
//! use umig_pipeline::batcher::{SetField, StreamBatcher};
//! use umig_pipeline::import::ImportOrchestrator;
//! use umig_pipeline::poller::PollPolicy;
//! use umig_pipeline::TenantClient;
//!
//! async fn replay(client: &dyn TenantClient, archive: &[u8]) -> umig_common::Result<()> {
//!     let ndjson = umig_pipeline::archive::decompress(archive)?;
//!     let batches = StreamBatcher::new(ndjson.as_slice(), 500_000)?
//!         .with_transform(SetField::new("email_verified", true))
//!         .collect::<umig_common::Result<Vec<_>>>()?;
//!
//!     ImportOrchestrator::new(client, PollPolicy::default())
//!         .import_all(&batches, "con_destination")
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod batcher;
pub mod export;
pub mod import;
pub mod poller;
pub mod tenant;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use batcher::{Batch, RecordTransform, SetField, StreamBatcher};
pub use export::ExportOrchestrator;
pub use import::{ImportObserver, ImportOrchestrator, ImportReport};
pub use poller::{JobPoller, PollOutcome, PollPolicy};
pub use tenant::{ExportRequest, ImportRequest, TenantClient};
pub use types::{ImportSummary, Job, JobStatus, Record};
pub use tokio_util::sync::CancellationToken;
