//! Export archive retrieval
//!
//! Downloads the archive from the location reported by a completed export
//! job and streams it into [`ArchiveStore`]. Establishing the download is
//! retried with a linearly increasing delay; a transfer that breaks midway
//! is not resumed.

use crate::error::{CliError, Result};
use crate::progress;
use crate::storage::ArchiveStore;
use reqwest::{Client, Response};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use umig_common::MigrateError;

/// Attempts made to establish the download
pub const MAX_RETRIES: u32 = 3;

/// Base delay between attempts in seconds, multiplied by the attempt number
pub const RETRY_DELAY_SECS: u64 = 5;

/// HTTP client for archive downloads
pub struct ArchiveFetcher {
    http: Client,
    retry_delay: Duration,
}

impl ArchiveFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            retry_delay: Duration::from_secs(RETRY_DELAY_SECS),
        })
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Open the download, retrying connection failures and server errors
    ///
    /// Client errors (4xx) are not retried; a rejected download location
    /// does not heal by asking again.
    pub async fn fetch(&self, location: &str) -> Result<Response> {
        let mut attempt = 1;
        loop {
            debug!(attempt, max = MAX_RETRIES, "Requesting export archive");

            let error = match self.http.get(location).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if response.status().is_client_error() => {
                    return Err(MigrateError::transport(format!(
                        "archive download was rejected with {}",
                        response.status()
                    ))
                    .into());
                },
                Ok(response) => format!("server answered {}", response.status()),
                Err(e) => e.to_string(),
            };

            if attempt >= MAX_RETRIES {
                return Err(MigrateError::transport(format!(
                    "archive download failed after {} attempts: {}",
                    MAX_RETRIES, error
                ))
                .into());
            }

            let delay = self.retry_delay * attempt;
            warn!(
                "Download attempt {}/{} failed: {}. Retrying in {:?}...",
                attempt, MAX_RETRIES, error, delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Download `location` into `store`, returning the number of bytes written
    pub async fn download(
        &self,
        location: &str,
        store: &ArchiveStore,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(cancelled()),
            response = self.fetch(location) => response?,
        };

        let pb = match response.content_length() {
            Some(len) => progress::create_download_progress(len, "Downloading export archive"),
            None => progress::create_spinner("Downloading export archive"),
        };

        let written = tokio::select! {
            _ = cancel.cancelled() => {
                pb.abandon();
                return Err(cancelled());
            },
            written = store.persist_stream(response.bytes_stream(), Some(&pb)) => written,
        };

        match written {
            Ok(bytes) => {
                pb.finish_and_clear();
                info!(bytes, path = %store.path().display(), "Export archive downloaded");
                Ok(bytes)
            },
            Err(e) => {
                pb.abandon();
                Err(e)
            },
        }
    }
}

fn cancelled() -> CliError {
    MigrateError::Cancelled("downloading the export archive".to_string()).into()
}
