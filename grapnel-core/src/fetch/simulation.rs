//! Simulation stream fetcher for tests and development.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use super::{ByteStream, FetchError, StreamFetcher};
use crate::catalog::{Credential, FormatDescriptor};

/// Serves canned chunk sequences per format id.
///
/// Formats registered with `failing_format` yield their chunks and then an
/// error item, mimicking an upstream transfer that dies mid-stream. Unknown
/// format ids fail on open.
#[derive(Default)]
pub struct SimulationStreamFetcher {
    payloads: HashMap<String, Vec<Bytes>>,
    failing: HashMap<String, Vec<Bytes>>,
}

impl SimulationStreamFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a format that streams the given chunks and completes.
    pub fn with_format(mut self, id: impl Into<String>, chunks: Vec<&'static [u8]>) -> Self {
        self.payloads
            .insert(id.into(), chunks.into_iter().map(Bytes::from_static).collect());
        self
    }

    /// Registers a format that streams the given chunks and then errors.
    pub fn with_failing_format(mut self, id: impl Into<String>, chunks: Vec<&'static [u8]>) -> Self {
        self.failing
            .insert(id.into(), chunks.into_iter().map(Bytes::from_static).collect());
        self
    }
}

#[async_trait]
impl StreamFetcher for SimulationStreamFetcher {
    async fn open(
        &self,
        _resource: &str,
        format: &FormatDescriptor,
        _credential: Option<&Credential>,
    ) -> Result<ByteStream, FetchError> {
        if let Some(chunks) = self.payloads.get(&format.id) {
            let items: Vec<Result<Bytes, FetchError>> =
                chunks.iter().cloned().map(Ok).collect();
            return Ok(Box::pin(stream::iter(items)));
        }

        if let Some(chunks) = self.failing.get(&format.id) {
            let mut items: Vec<Result<Bytes, FetchError>> =
                chunks.iter().cloned().map(Ok).collect();
            items.push(Err(FetchError::Transfer {
                reason: "simulated mid-stream failure".to_string(),
            }));
            return Ok(Box::pin(stream::iter(items)));
        }

        Err(FetchError::UpstreamStatus { status: 404 })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn test_simulation_fetcher_streams_chunks() {
        let fetcher = SimulationStreamFetcher::new().with_format("140", vec![b"ab", b"cd"]);
        let format = FormatDescriptor::new("140", "m4a", false, true);

        let mut stream = fetcher.open("res", &format, None).await.unwrap();
        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, b"abcd");
    }

    #[tokio::test]
    async fn test_simulation_fetcher_mid_stream_failure() {
        let fetcher =
            SimulationStreamFetcher::new().with_failing_format("137", vec![b"partial"]);
        let format = FormatDescriptor::new("137", "mp4", true, false);

        let mut stream = fetcher.open("res", &format, None).await.unwrap();
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_simulation_fetcher_unknown_format() {
        let fetcher = SimulationStreamFetcher::new();
        let format = FormatDescriptor::new("999", "mp4", true, true);

        let result = fetcher.open("res", &format, None).await;
        assert!(matches!(
            result,
            Err(FetchError::UpstreamStatus { status: 404 })
        ));
    }
}
