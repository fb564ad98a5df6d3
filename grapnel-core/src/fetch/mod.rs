//! Stream fetcher boundary.
//!
//! The fetcher is the external collaborator that opens a byte stream for one
//! selected format. The stream is consumed either by the temp materializer
//! (combine path) or by the response streamer (pass-through path).

pub mod http;
pub mod simulation;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

pub use http::HttpStreamFetcher;
pub use simulation::SimulationStreamFetcher;

use crate::catalog::{Credential, FormatDescriptor};

/// Chunked byte stream from the remote origin.
///
/// Each item is one data chunk; the stream ends on upstream completion and
/// yields an error item on upstream failure.
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// Errors from opening or draining an upstream stream.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The origin answered with a non-success status.
    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16 },

    /// The transfer failed after it was opened.
    #[error("upstream transfer failed: {reason}")]
    Transfer { reason: String },

    /// The selected format carries no retrievable source URL.
    #[error("format {id} has no retrievable source url")]
    MissingSourceUrl { id: String },

    /// Local I/O failure while persisting the stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// External collaborator that opens push-based byte streams for formats.
#[async_trait]
pub trait StreamFetcher: Send + Sync {
    /// Opens a byte stream for the given format of a resource.
    ///
    /// # Errors
    ///
    /// - `FetchError::MissingSourceUrl` - descriptor has no origin URL
    /// - `FetchError::UpstreamStatus` - origin refused the request
    /// - `FetchError::Transfer` - connection could not be established
    async fn open(
        &self,
        resource: &str,
        format: &FormatDescriptor,
        credential: Option<&Credential>,
    ) -> Result<ByteStream, FetchError>;
}
