//! `umig export` command implementation
//!
//! Starts the export job on the source tenant, waits for it and downloads
//! the archive it produces.

use crate::api::ManagementClient;
use crate::commands::Context;
use crate::error::{Result, StepContext};
use crate::progress;
use crate::retrieval::ArchiveFetcher;
use crate::ExportArgs;
use colored::Colorize;
use std::time::Duration;
use tracing::info;
use umig_pipeline::export::default_fields;
use umig_pipeline::{ExportOrchestrator, PollPolicy};

/// Total wait ceiling for the export job; exports of large tenants run long
pub const EXPORT_MAX_WAIT: Duration = Duration::from_secs(15 * 60);

/// Poll schedule used for the export job unless overridden
pub fn default_poll_policy() -> Result<PollPolicy> {
    Ok(PollPolicy::default().with_max_wait(EXPORT_MAX_WAIT)?)
}

/// Run the export phase
pub async fn run(ctx: &Context<'_>, args: &ExportArgs) -> Result<()> {
    let policy = args.poll.policy(default_poll_policy()?)?;
    let fields = if args.fields.is_empty() {
        default_fields()
    } else {
        args.fields.clone()
    };
    let source = &ctx.config.source;

    let client = ManagementClient::new(source, ctx.http_timeout)?;
    println!(
        "{} Exporting users from {} (connection {})",
        "→".cyan(),
        client.base_url(),
        source.connection_id
    );

    let spinner = progress::create_spinner("Waiting for export job");
    let location = ExportOrchestrator::new(&client, policy)
        .with_limit(args.limit)
        .with_cancellation(ctx.cancel.clone())
        .export_all(&fields, &source.connection_id)
        .await;
    spinner.finish_and_clear();
    let location = location.step("Export job")?;
    println!("{} Export job completed", "✓".green());

    println!("{} Downloading archive to {}", "↓".cyan(), ctx.store.path().display());
    let fetcher = ArchiveFetcher::new(ctx.http_timeout)?;
    let bytes = fetcher
        .download(&location, ctx.store, &ctx.cancel)
        .await
        .step("Archive download")?;

    let digest = ctx.store.checksum().step("Archive checksum")?;
    info!(
        path = %ctx.store.path().display(),
        bytes,
        sha256 = %digest,
        "Export archive ready"
    );

    println!(
        "\n{} Archive saved: {} ({})",
        "✓".green().bold(),
        ctx.store.path().display(),
        progress::format_bytes(bytes)
    );
    println!("  sha256 {}", digest.dimmed());

    Ok(())
}
