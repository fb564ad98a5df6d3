//! Temp materialization of upstream streams.
//!
//! The remux stage needs seekable, complete inputs, so each negotiated
//! stream is drained fully to scratch storage before ffmpeg runs. A failed
//! drain leaves no partial file behind.

use std::path::Path;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::fetch::{ByteStream, FetchError};

/// Drains a fetched stream into the given scratch path.
///
/// Returns the number of bytes written once the stream signals completion.
/// Any upstream or write error removes the partial file before propagating.
pub async fn materialize(stream: ByteStream, path: &Path) -> Result<u64, FetchError> {
    match drain_to_file(stream, path).await {
        Ok(written) => {
            tracing::debug!("Materialized {written} bytes to {}", path.display());
            Ok(written)
        }
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(path).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        "Failed to remove partial file {}: {remove_err}",
                        path.display()
                    );
                }
            }
            Err(e)
        }
    }
}

async fn drain_to_file(mut stream: ByteStream, path: &Path) -> Result<u64, FetchError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        file.write_all(&bytes).await?;
        written += bytes.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}
