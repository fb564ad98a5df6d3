//! Format catalog boundary and remote format model.
//!
//! The catalog is the external collaborator that, given a resource
//! identifier, returns the list of formats the origin advertises along with
//! the resource metadata. Everything downstream (selection, fetching,
//! remuxing) operates on the `FormatDescriptor` model defined here; the
//! capability tag is computed once at ingestion so predicates never re-derive
//! boolean combinations at call sites.

pub mod simulation;
pub mod ytdlp;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use simulation::SimulationCatalog;
pub use ytdlp::YtDlpCatalog;

/// Derived capability tag for one remote format.
///
/// Computed exactly once when a descriptor is ingested, then matched on
/// everywhere a video/audio capability decision is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamKind {
    /// Pre-combined video + audio stream
    MuxedAv,
    /// Video elementary stream without audio
    VideoOnly,
    /// Audio elementary stream without video
    AudioOnly,
    /// Carries neither usable video nor audio (storyboards, subtitles)
    #[default]
    Other,
}

impl StreamKind {
    /// Derives the tag from the origin's capability flags.
    pub fn from_flags(has_video: bool, has_audio: bool) -> Self {
        match (has_video, has_audio) {
            (true, true) => StreamKind::MuxedAv,
            (true, false) => StreamKind::VideoOnly,
            (false, true) => StreamKind::AudioOnly,
            (false, false) => StreamKind::Other,
        }
    }

    pub fn has_video(self) -> bool {
        matches!(self, StreamKind::MuxedAv | StreamKind::VideoOnly)
    }

    pub fn has_audio(self) -> bool {
        matches!(self, StreamKind::MuxedAv | StreamKind::AudioOnly)
    }
}

/// One origin-advertised combination of container and quality attributes
/// for a retrievable stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatDescriptor {
    /// Opaque format identifier ("itag"-style id)
    pub id: String,
    /// Container the origin serves this format in
    pub container: String,
    pub has_video: bool,
    pub has_audio: bool,
    /// Human-readable quality label, e.g. "1080p" or "720p60"
    pub quality_label: Option<String>,
    /// Average audio bitrate in kbit/s
    pub audio_bitrate_kbps: Option<u32>,
    /// Payload size in bytes, when the origin reports it
    pub content_length: Option<u64>,
    /// Derived capability tag; not part of the API surface
    #[serde(skip)]
    pub kind: StreamKind,
    /// Direct origin URL for this format, consumed by the stream fetcher;
    /// never serialized into responses
    #[serde(skip)]
    pub source_url: Option<String>,
}

impl FormatDescriptor {
    /// Builds a descriptor, deriving the capability tag from the flags.
    pub fn new(
        id: impl Into<String>,
        container: impl Into<String>,
        has_video: bool,
        has_audio: bool,
    ) -> Self {
        Self {
            id: id.into(),
            container: container.into(),
            has_video,
            has_audio,
            quality_label: None,
            audio_bitrate_kbps: None,
            content_length: None,
            kind: StreamKind::from_flags(has_video, has_audio),
            source_url: None,
        }
    }

    pub fn with_quality_label(mut self, label: impl Into<String>) -> Self {
        self.quality_label = Some(label.into());
        self
    }

    pub fn with_audio_bitrate(mut self, kbps: u32) -> Self {
        self.audio_bitrate_kbps = Some(kbps);
        self
    }

    pub fn with_content_length(mut self, bytes: u64) -> Self {
        self.content_length = Some(bytes);
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Numeric ranking value parsed from the quality label.
    ///
    /// "1080p60" ranks as 1080; a missing or unparseable label ranks as 0.
    pub fn quality_value(&self) -> u32 {
        let Some(label) = &self.quality_label else {
            return 0;
        };
        let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().unwrap_or(0)
    }

    /// Audio bitrate ranking value; a missing bitrate ranks as 0.
    pub fn bitrate_value(&self) -> u32 {
        self.audio_bitrate_kbps.unwrap_or(0)
    }
}

/// Resource metadata returned alongside the format list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub title: String,
    pub thumbnail: String,
    pub duration_seconds: u64,
    pub view_count: u64,
    pub author: String,
    pub resource_id: String,
    pub formats: Vec<FormatDescriptor>,
}

/// Opaque credential token forwarded verbatim to collaborators.
///
/// The token is never logged; the Debug impl redacts it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Errors from the catalog collaborator.
///
/// The variants are deliberately coarse but distinguishable: the request
/// boundary maps them onto distinct HTTP statuses.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// The origin resource is deleted or private.
    #[error("resource is unavailable or private")]
    ResourceUnavailable,

    /// The resource exists but is age/region/login gated.
    #[error("access to this resource is restricted")]
    AccessRestricted,

    /// The identifier or URL is not something the catalog recognizes.
    #[error("invalid resource identifier: {reason}")]
    InvalidResource { reason: String },

    /// Any other catalog failure (process error, malformed output).
    #[error("catalog lookup failed: {reason}")]
    LookupFailed { reason: String },
}

/// External collaborator that resolves resource metadata and format lists.
#[async_trait]
pub trait FormatCatalog: Send + Sync {
    /// Checks whether the identifier or URL refers to a resource this
    /// catalog can resolve. Cheap and purely syntactic.
    fn validate(&self, resource: &str) -> bool;

    /// Fetches metadata and the advertised format list for a resource.
    ///
    /// # Errors
    ///
    /// - `CatalogError::ResourceUnavailable` - resource deleted or private
    /// - `CatalogError::AccessRestricted` - age/region/login gated
    /// - `CatalogError::InvalidResource` - identifier not recognized
    /// - `CatalogError::LookupFailed` - collaborator process or parse failure
    async fn video_info(
        &self,
        resource: &str,
        credential: Option<&Credential>,
    ) -> Result<VideoMetadata, CatalogError>;
}
