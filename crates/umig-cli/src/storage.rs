//! Export archive storage
//!
//! The archive is the only artifact shared by the export and import phases.
//! It is written to a temporary file next to its final path and renamed into
//! place once complete, so an interrupted download never leaves a truncated
//! archive behind.

use crate::error::{CliError, Result};
use futures::{Stream, StreamExt};
use indicatif::ProgressBar;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use umig_common::checksum;

/// Default location of the export archive
pub const DEFAULT_ARCHIVE_PATH: &str = "exported_users.json.gz";

/// Handle to the export archive on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveStore {
    path: PathBuf,
}

impl ArchiveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write every chunk of `stream` to the archive, replacing any previous one
    ///
    /// Returns the number of bytes written. On error, or if the returned
    /// future is dropped early, the existing archive is left untouched.
    pub async fn persist_stream<S, B, E>(
        &self,
        stream: S,
        progress: Option<&ProgressBar>,
    ) -> Result<u64>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<CliError>,
    {
        let dir = self.parent_dir();
        tokio::fs::create_dir_all(dir).await?;

        let partial = tempfile::Builder::new()
            .prefix(".umig-")
            .suffix(".partial")
            .tempfile_in(dir)?;
        let mut file = tokio::fs::File::from_std(partial.reopen()?);

        let mut stream = std::pin::pin!(stream);
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Into::into)?;
            let bytes = chunk.as_ref();
            file.write_all(bytes).await?;
            written += bytes.len() as u64;
            if let Some(pb) = progress {
                pb.set_position(written);
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        partial.persist(&self.path).map_err(|e| CliError::Io(e.error))?;
        info!(path = %self.path.display(), bytes = written, "Archive stored");
        Ok(written)
    }

    /// Open the archive for reading
    ///
    /// # Errors
    /// [`CliError::ArchiveNotFound`] when no archive exists at the path.
    pub fn open(&self) -> Result<BufReader<File>> {
        match File::open(&self.path) {
            Ok(file) => {
                debug!(path = %self.path.display(), "Opened archive");
                Ok(BufReader::new(file))
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::ArchiveNotFound(self.path.display().to_string()))
            },
            Err(e) => Err(e.into()),
        }
    }

    /// SHA-256 of the stored archive, hex encoded
    pub fn checksum(&self) -> Result<String> {
        if !self.exists() {
            return Err(CliError::ArchiveNotFound(self.path.display().to_string()));
        }
        Ok(checksum::sha256_file(&self.path)?)
    }

    fn parent_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

impl Default for ArchiveStore {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_PATH)
    }
}
