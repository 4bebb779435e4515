//! `umig import` command implementation
//!
//! Decodes the stored archive into size-bounded batches and replays them as
//! sequential upsert imports on the destination tenant.

use crate::api::ManagementClient;
use crate::commands::Context;
use crate::error::{CliError, Result, StepContext};
use crate::progress;
use crate::storage::ArchiveStore;
use crate::ImportArgs;
use colored::Colorize;
use indicatif::ProgressBar;
use tracing::info;
use umig_pipeline::{
    archive, Batch, ImportObserver, ImportOrchestrator, Job, PollPolicy, SetField, StreamBatcher,
};

/// Default upper bound on the serialized size of one batch
pub const DEFAULT_MAX_BATCH_BYTES: usize = 500_000;

/// Flag forced on every imported record unless --keep-email-verified is given
pub const EMAIL_VERIFIED_FIELD: &str = "email_verified";

/// Run the import phase
pub async fn run(ctx: &Context<'_>, args: &ImportArgs) -> Result<()> {
    let policy = args.poll.policy(PollPolicy::default())?;
    let destination = &ctx.config.destination;

    let digest = ctx.store.checksum().step("Reading archive")?;
    info!(path = %ctx.store.path().display(), sha256 = %digest, "Importing archive");
    println!(
        "{} Reading archive {} (sha256 {})",
        "→".cyan(),
        ctx.store.path().display(),
        digest.dimmed()
    );

    let batches = load_batches(ctx.store.clone(), args.max_batch_bytes, !args.keep_email_verified)
        .await
        .step("Decoding archive")?;
    let records: usize = batches.iter().map(Batch::len).sum();
    println!(
        "{} {} user(s) in {} batch(es)",
        "✓".green(),
        records,
        batches.len()
    );

    if batches.is_empty() {
        println!("Nothing to import.");
        return Ok(());
    }

    let client = ManagementClient::new(destination, ctx.http_timeout)?;
    println!(
        "{} Importing into {} (connection {})",
        "↑".cyan(),
        client.base_url(),
        destination.connection_id
    );

    let observer = BatchProgress::new(batches.len());
    let result = ImportOrchestrator::new(&client, policy)
        .with_observer(&observer)
        .with_cancellation(ctx.cancel.clone())
        .import_all(&batches, &destination.connection_id)
        .await;

    let report = match result {
        Ok(report) => {
            observer.pb.finish_and_clear();
            report
        },
        Err(e) => {
            observer.pb.abandon();
            return Err(CliError::from(e).in_step("Importing batches"));
        },
    };

    println!(
        "\n{} Imported {} user(s) in {} batch(es)",
        "✓".green().bold(),
        report.records,
        report.batches
    );
    println!(
        "  {} inserted, {} updated, {} failed",
        report.summary.inserted, report.summary.updated, report.summary.failed
    );
    if report.summary.failed > 0 {
        println!(
            "{} The destination rejected {} user(s); check the tenant's job logs for details",
            "!".yellow().bold(),
            report.summary.failed
        );
    }

    Ok(())
}

/// Decompress and batch the archive off the async runtime
async fn load_batches(store: ArchiveStore, max_batch_bytes: usize, force_verified: bool) -> Result<Vec<Batch>> {
    tokio::task::spawn_blocking(move || -> Result<Vec<Batch>> {
        let ndjson = archive::decompress(store.open()?)?;

        let mut batcher = StreamBatcher::new(ndjson.as_slice(), max_batch_bytes)?;
        if force_verified {
            batcher = batcher.with_transform(SetField::new(EMAIL_VERIFIED_FIELD, true));
        }

        let batches = batcher.by_ref().collect::<umig_common::Result<Vec<_>>>()?;
        info!(
            records = batcher.records_decoded(),
            batches = batches.len(),
            max_batch_bytes,
            "Archive decoded"
        );
        Ok(batches)
    })
    .await
    .map_err(|e| CliError::Other(anyhow::anyhow!("archive decoding task panicked: {}", e)))?
}

/// Drives the batch progress bar from orchestrator events
struct BatchProgress {
    pb: ProgressBar,
}

impl BatchProgress {
    fn new(total: usize) -> Self {
        Self {
            pb: progress::create_batch_progress(total as u64),
        }
    }
}

impl ImportObserver for BatchProgress {
    fn batch_started(&self, _index: usize, _total: usize, records: usize) {
        self.pb.set_message(format!("({} users)", records));
    }

    fn batch_completed(&self, index: usize, total: usize, job: &Job) {
        self.pb.inc(1);
        if let Some(summary) = job.summary {
            self.pb.println(format!(
                "{} batch {}/{} ({}): {} inserted, {} updated, {} failed",
                "✓".green(),
                index,
                total,
                job.id,
                summary.inserted,
                summary.updated,
                summary.failed
            ));
        }
    }
}
