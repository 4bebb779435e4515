//! Gzip codec for the export archive
//!
//! The source tenant delivers its export as gzip-compressed newline-delimited
//! JSON, possibly split over several concatenated gzip members. Decompression
//! is all-or-nothing: callers get the complete payload or an error, never a
//! silently truncated buffer.

use flate2::read::MultiGzDecoder;
use std::io::{ErrorKind, Read};
use tracing::debug;
use umig_common::{MigrateError, Result};

/// Decompress a gzip stream in full, across every member it contains
///
/// # Errors
/// - [`MigrateError::Decode`] when the input is empty, has no valid gzip
///   header, a member's deflate body or trailer is corrupt or truncated, or
///   bytes after the last member are not another gzip member
/// - [`MigrateError::Io`] when the underlying reader fails
pub fn decompress<R: Read>(reader: R) -> Result<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(reader);
    let mut decompressed = Vec::new();

    decoder
        .read_to_end(&mut decompressed)
        .map_err(classify_read_error)?;

    // An empty input reads as zero bytes without ever producing a header.
    if decoder.header().is_none() {
        return Err(MigrateError::decode("archive is empty or has no gzip header"));
    }

    debug!(bytes = decompressed.len(), "Decompressed archive");
    Ok(decompressed)
}

/// Framing problems surface from flate2 as these kinds; anything else came
/// from the reader underneath.
fn classify_read_error(err: std::io::Error) -> MigrateError {
    match err.kind() {
        ErrorKind::InvalidInput | ErrorKind::InvalidData | ErrorKind::UnexpectedEof => {
            MigrateError::decode(format!("archive is not a valid gzip stream: {}", err))
        },
        _ => MigrateError::Io(err),
    }
}
