//! Pull-based response streaming for pass-through downloads.
//!
//! Bridges the upstream byte stream to the HTTP body writer through a
//! bounded channel: the pump task feeds chunks in as fast as the channel
//! allows, and the consumer's pace governs how many chunks are buffered
//! ahead. Dropping the stream aborts the pump, which releases the upstream
//! fetch when the client disconnects mid-transfer.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::fetch::{ByteStream, FetchError};

/// Backpressure-aware byte sequence consumable as an HTTP response body.
///
/// Upstream end-of-stream closes the sequence cleanly; an upstream error
/// aborts it with that error, which the HTTP layer surfaces as a truncated
/// response.
pub struct ResponseStream {
    chunks: mpsc::Receiver<Result<Bytes, FetchError>>,
    pump: JoinHandle<()>,
}

impl ResponseStream {
    /// Spawns the pump task and returns the pull side of the bridge.
    ///
    /// `readahead_chunks` bounds how many chunks may sit in the channel
    /// ahead of the consumer.
    pub fn spawn(mut source: ByteStream, readahead_chunks: usize) -> Self {
        let (tx, rx) = mpsc::channel(readahead_chunks.max(1));

        let pump = tokio::spawn(async move {
            while let Some(chunk) = source.next().await {
                let is_error = chunk.is_err();
                if tx.send(chunk).await.is_err() {
                    // Receiver dropped: the client went away. Stop pulling
                    // so the upstream connection is released.
                    tracing::debug!("Response stream consumer disconnected, stopping pump");
                    return;
                }
                if is_error {
                    return;
                }
            }
        });

        Self { chunks: rx, pump }
    }
}

impl Stream for ResponseStream {
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.chunks
            .poll_recv(cx)
            .map(|item| item.map(|result| result.map_err(std::io::Error::other)))
    }
}

impl Drop for ResponseStream {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
