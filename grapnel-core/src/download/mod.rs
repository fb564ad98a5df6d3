//! Download orchestration.
//!
//! One request flows through here end to end: resolve the catalog, select
//! format(s), then either pass a single upstream stream through to the
//! client or materialize separate video and audio streams and remux them
//! locally. Ephemeral files are removed on every exit path.

pub mod materialize;
pub mod merge;
pub mod scratch;
pub mod selector;

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

pub use materialize::materialize;
pub use merge::{FfmpegMuxer, MergeError, MergeJob, MergeState, MuxOptions, Muxer, SimulationMuxer};
pub use scratch::{ScratchSpace, StreamRole};
pub use selector::{SelectionError, SelectionResult, select};

use crate::catalog::{CatalogError, Credential, FormatCatalog, FormatDescriptor, VideoMetadata};
use crate::config::GrapnelConfig;
use crate::fetch::{FetchError, StreamFetcher};
use crate::streaming::ResponseStream;

/// What the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    /// Combined video + audio in one container
    MuxedVideo,
    /// Audio track only
    AudioOnly,
    /// Video track only, no audio
    VideoOnly,
}

impl DownloadMode {
    /// Parses the request-body label used by the HTTP API.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label {
            "mp4" => Some(DownloadMode::MuxedVideo),
            "mp3" => Some(DownloadMode::AudioOnly),
            "video-only" => Some(DownloadMode::VideoOnly),
            _ => None,
        }
    }

    /// Target container passed to the muxer for combine requests.
    pub fn container(self) -> &'static str {
        match self {
            DownloadMode::MuxedVideo | DownloadMode::VideoOnly => "mp4",
            DownloadMode::AudioOnly => "mp3",
        }
    }

    /// Extension for the attachment filename.
    pub fn file_extension(self) -> &'static str {
        self.container()
    }

    /// MIME type for the response body.
    pub fn content_type(self) -> &'static str {
        match self {
            DownloadMode::MuxedVideo | DownloadMode::VideoOnly => "video/mp4",
            DownloadMode::AudioOnly => "audio/mpeg",
        }
    }
}

/// One download request, as the service consumes it.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub resource_id: String,
    pub mode: DownloadMode,
    /// Pins selection to one exact format, bypassing heuristic ranking
    pub explicit_format_id: Option<String>,
    /// Fetch video and audio separately and remux locally; only meaningful
    /// for `MuxedVideo`
    pub combine: bool,
    pub credential: Option<Credential>,
}

/// Errors from download orchestration, mapped onto HTTP statuses at the
/// request boundary.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("video stream fetch failed: {source}")]
    VideoFetchFailed { source: FetchError },

    #[error("audio stream fetch failed: {source}")]
    AudioFetchFailed { source: FetchError },

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("merged output could not be read: {source}")]
    OutputReadFailed { source: std::io::Error },

    #[error("upstream fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("scratch storage unavailable: {0}")]
    Scratch(std::io::Error),
}

impl DownloadError {
    /// Returns a user-facing message that leaks no internal detail.
    pub fn user_message(&self) -> String {
        match self {
            DownloadError::InvalidRequest { reason } => reason.clone(),
            DownloadError::Catalog(CatalogError::ResourceUnavailable) => {
                "Video is unavailable or private".to_string()
            }
            DownloadError::Catalog(CatalogError::AccessRestricted) => {
                "This video cannot be accessed without authorization".to_string()
            }
            DownloadError::Catalog(CatalogError::InvalidResource { .. }) => {
                "Invalid video identifier".to_string()
            }
            DownloadError::Catalog(CatalogError::LookupFailed { .. }) => {
                "Failed to fetch video information".to_string()
            }
            DownloadError::Selection(_) => "No suitable format found".to_string(),
            DownloadError::VideoFetchFailed { .. }
            | DownloadError::AudioFetchFailed { .. }
            | DownloadError::Fetch(_) => "Failed to fetch media stream".to_string(),
            DownloadError::Merge(_) => "Failed to merge video and audio streams".to_string(),
            DownloadError::OutputReadFailed { .. } | DownloadError::Scratch(_) => {
                "Download failed".to_string()
            }
        }
    }
}

/// Response payload for one download.
pub struct DownloadDelivery {
    /// Attachment filename derived from the sanitized title
    pub file_name: String,
    pub content_type: &'static str,
    /// Known payload size; set for buffered bodies and for pass-through
    /// streams whose descriptor reported a length
    pub content_length: Option<u64>,
    pub body: DeliveryBody,
}

/// Body of a download response.
pub enum DeliveryBody {
    /// Backpressure-aware pass-through of a single upstream stream
    Streamed(ResponseStream),
    /// Fully buffered merge output
    Buffered(Bytes),
}

/// Orchestrates metadata lookups and downloads against the collaborator
/// boundary.
pub struct DownloadService {
    catalog: Arc<dyn FormatCatalog>,
    fetcher: Arc<dyn StreamFetcher>,
    muxer: Arc<dyn Muxer>,
    config: GrapnelConfig,
}

impl DownloadService {
    pub fn new(
        catalog: Arc<dyn FormatCatalog>,
        fetcher: Arc<dyn StreamFetcher>,
        muxer: Arc<dyn Muxer>,
        config: GrapnelConfig,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            muxer,
            config,
        }
    }

    /// Fetches resource metadata and the advertised format list.
    pub async fn metadata(
        &self,
        resource: &str,
        credential: Option<&Credential>,
    ) -> Result<VideoMetadata, DownloadError> {
        if !self.catalog.validate(resource) {
            return Err(DownloadError::InvalidRequest {
                reason: "Invalid video URL or identifier".to_string(),
            });
        }
        Ok(self.catalog.video_info(resource, credential).await?)
    }

    /// Runs one download request to completion.
    pub async fn download(
        &self,
        request: &DownloadRequest,
    ) -> Result<DownloadDelivery, DownloadError> {
        if !self.catalog.validate(&request.resource_id) {
            return Err(DownloadError::InvalidRequest {
                reason: "Invalid video URL or identifier".to_string(),
            });
        }

        let info = self
            .catalog
            .video_info(&request.resource_id, request.credential.as_ref())
            .await?;

        let selection = select(&info.formats, request)?;
        let file_name = format!(
            "{}.{}",
            attachment_stem(&info.title, &info.resource_id),
            request.mode.file_extension()
        );

        tracing::info!(
            "Selected format {} (secondary: {:?}) for \"{}\"",
            selection.primary.id,
            selection.secondary.as_ref().map(|f| f.id.as_str()),
            info.title
        );

        match &selection.secondary {
            Some(audio_format) => {
                let merged = self
                    .combine(request, &selection.primary, audio_format)
                    .await?;
                Ok(DownloadDelivery {
                    file_name,
                    content_type: request.mode.content_type(),
                    content_length: Some(merged.len() as u64),
                    body: DeliveryBody::Buffered(merged),
                })
            }
            None => {
                let stream = self
                    .fetcher
                    .open(
                        &request.resource_id,
                        &selection.primary,
                        request.credential.as_ref(),
                    )
                    .await?;
                Ok(DownloadDelivery {
                    file_name,
                    content_type: request.mode.content_type(),
                    content_length: selection.primary.content_length,
                    body: DeliveryBody::Streamed(ResponseStream::spawn(
                        stream,
                        self.config.fetch.readahead_chunks,
                    )),
                })
            }
        }
    }

    /// Two-stream combine path: materialize video, materialize audio, merge
    /// with stream copy, read the result, and clean up every scratch file
    /// regardless of outcome.
    ///
    /// The merged container's trailing index depends on the whole file, so
    /// the output is buffered rather than streamed; a partial container
    /// must never reach the client.
    async fn combine(
        &self,
        request: &DownloadRequest,
        video_format: &FormatDescriptor,
        audio_format: &FormatDescriptor,
    ) -> Result<Bytes, DownloadError> {
        let scratch_dir = &self.config.remux.scratch_dir;
        tokio::fs::create_dir_all(scratch_dir)
            .await
            .map_err(DownloadError::Scratch)?;

        let mut scratch = ScratchSpace::new(scratch_dir, &request.resource_id);
        let video_path = scratch.allocate(StreamRole::Video, &video_format.container);
        let audio_path = scratch.allocate(StreamRole::Audio, &audio_format.container);
        let output_path = scratch.allocate(StreamRole::Output, request.mode.file_extension());

        let mut job = MergeJob::new(video_path, audio_path, output_path);
        job.advance(MergeState::Materializing);

        // The two materializations run sequentially: one writer at a time
        // keeps failure attribution unambiguous.
        let video_result = self
            .materialize_format(request, video_format, &job.video_path)
            .await;
        if let Err(source) = video_result {
            job.advance(MergeState::Failed);
            scratch.cleanup().await;
            return Err(DownloadError::VideoFetchFailed { source });
        }

        let audio_result = self
            .materialize_format(request, audio_format, &job.audio_path)
            .await;
        if let Err(source) = audio_result {
            job.advance(MergeState::Failed);
            scratch.cleanup().await;
            return Err(DownloadError::AudioFetchFailed { source });
        }

        job.advance(MergeState::Merging);
        let merge_result = self
            .muxer
            .merge(
                &job.video_path,
                &job.audio_path,
                &job.output_path,
                &MuxOptions::default(),
                request.mode.container(),
            )
            .await;
        if let Err(e) = merge_result {
            job.advance(MergeState::Failed);
            scratch.cleanup().await;
            return Err(e.into());
        }

        let read_result = tokio::fs::read(&job.output_path).await;
        // Files go away whether or not the read worked.
        scratch.cleanup().await;

        match read_result {
            Ok(merged) => {
                job.advance(MergeState::Done);
                Ok(Bytes::from(merged))
            }
            Err(source) => {
                job.advance(MergeState::Failed);
                Err(DownloadError::OutputReadFailed { source })
            }
        }
    }

    async fn materialize_format(
        &self,
        request: &DownloadRequest,
        format: &FormatDescriptor,
        path: &std::path::Path,
    ) -> Result<u64, FetchError> {
        let stream = self
            .fetcher
            .open(&request.resource_id, format, request.credential.as_ref())
            .await?;
        materialize(stream, path).await
    }
}

/// Attachment filename stem: non-word characters stripped, whitespace runs
/// collapsed to underscores, falling back to the resource id when nothing
/// survives.
fn attachment_stem(title: &str, resource_id: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();
    let stem = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    if stem.is_empty() {
        resource_id.to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label() {
        assert_eq!(
            DownloadMode::parse_label("mp4"),
            Some(DownloadMode::MuxedVideo)
        );
        assert_eq!(
            DownloadMode::parse_label("mp3"),
            Some(DownloadMode::AudioOnly)
        );
        assert_eq!(
            DownloadMode::parse_label("video-only"),
            Some(DownloadMode::VideoOnly)
        );
        assert_eq!(DownloadMode::parse_label("flac"), None);
    }

    #[test]
    fn test_mode_response_attributes() {
        assert_eq!(DownloadMode::MuxedVideo.content_type(), "video/mp4");
        assert_eq!(DownloadMode::AudioOnly.content_type(), "audio/mpeg");
        assert_eq!(DownloadMode::VideoOnly.content_type(), "video/mp4");
        assert_eq!(DownloadMode::AudioOnly.file_extension(), "mp3");
    }

    #[test]
    fn test_attachment_stem_sanitization() {
        assert_eq!(
            attachment_stem("Never Gonna Give You Up", "id"),
            "Never_Gonna_Give_You_Up"
        );
        assert_eq!(
            attachment_stem("What's  up? (Official Video!)", "id"),
            "Whats_up_Official_Video"
        );
        assert_eq!(attachment_stem("!!!", "dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(attachment_stem("", "dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }
}
