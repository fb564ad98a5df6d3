//! Production format catalog backed by the yt-dlp binary.
//!
//! yt-dlp is invoked once per lookup with `--dump-json` and its output is
//! parsed into the `FormatDescriptor` model. Failures are classified from
//! stderr into the catalog error taxonomy so the request boundary can map
//! them to distinct HTTP statuses.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{CatalogError, Credential, FormatCatalog, FormatDescriptor, StreamKind, VideoMetadata};
use crate::config::CatalogConfig;

/// Resolves metadata and format lists by shelling out to yt-dlp.
pub struct YtDlpCatalog {
    binary: PathBuf,
}

impl YtDlpCatalog {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            binary: config.ytdlp_binary.clone(),
        }
    }

    /// Checks that the configured binary is runnable.
    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Canonical watch URL for a resource identifier.
    ///
    /// Bare video ids are expanded; anything else is passed through as-is.
    fn watch_url(resource: &str) -> String {
        if is_bare_video_id(resource) {
            format!("https://www.youtube.com/watch?v={resource}")
        } else {
            resource.to_string()
        }
    }
}

/// Bare video ids are 11 characters from the id alphabet.
fn is_bare_video_id(resource: &str) -> bool {
    resource.len() == 11
        && resource
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Maps a yt-dlp failure onto the catalog error taxonomy.
fn classify_failure(stderr: &str) -> CatalogError {
    if stderr.contains("Video unavailable") || stderr.contains("has been removed") {
        CatalogError::ResourceUnavailable
    } else if stderr.contains("Private video")
        || stderr.contains("age")
        || stderr.contains("Sign in")
    {
        CatalogError::AccessRestricted
    } else {
        CatalogError::LookupFailed {
            reason: stderr.lines().last().unwrap_or("unknown failure").to_string(),
        }
    }
}

/// Top-level shape of `yt-dlp --dump-json` output.
#[derive(Debug, Deserialize)]
struct RawVideoInfo {
    id: String,
    title: String,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    view_count: Option<u64>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: String,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    format_note: Option<String>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    abr: Option<f64>,
    #[serde(default)]
    filesize: Option<u64>,
    #[serde(default)]
    url: Option<String>,
}

fn codec_present(codec: &Option<String>) -> bool {
    codec.as_deref().is_some_and(|c| !c.is_empty() && c != "none")
}

impl RawFormat {
    fn into_descriptor(self) -> FormatDescriptor {
        let has_video = codec_present(&self.vcodec);
        let has_audio = codec_present(&self.acodec);

        // Prefer a numeric note like "1080p60"; fall back to the raw height.
        let quality_label = self
            .format_note
            .filter(|note| note.chars().next().is_some_and(|c| c.is_ascii_digit()))
            .or_else(|| self.height.map(|h| format!("{h}p")));

        let mut descriptor = FormatDescriptor::new(
            self.format_id,
            self.ext.unwrap_or_else(|| "unknown".to_string()),
            has_video,
            has_audio,
        );
        descriptor.quality_label = quality_label;
        descriptor.audio_bitrate_kbps = self.abr.map(|abr| abr.round() as u32);
        descriptor.content_length = self.filesize;
        descriptor.source_url = self.url;
        descriptor
    }
}

fn parse_video_info(raw_json: &str) -> Result<VideoMetadata, CatalogError> {
    let raw: RawVideoInfo =
        serde_json::from_str(raw_json).map_err(|e| CatalogError::LookupFailed {
            reason: format!("malformed catalog output: {e}"),
        })?;

    let formats: Vec<FormatDescriptor> = raw
        .formats
        .into_iter()
        .map(RawFormat::into_descriptor)
        .filter(|descriptor| descriptor.kind != StreamKind::Other)
        .collect();

    Ok(VideoMetadata {
        title: raw.title,
        thumbnail: raw.thumbnail.unwrap_or_default(),
        duration_seconds: raw.duration.map(|d| d.round() as u64).unwrap_or(0),
        view_count: raw.view_count.unwrap_or(0),
        author: raw.uploader.or(raw.channel).unwrap_or_default(),
        resource_id: raw.id,
        formats,
    })
}

#[async_trait]
impl FormatCatalog for YtDlpCatalog {
    fn validate(&self, resource: &str) -> bool {
        if is_bare_video_id(resource) {
            return true;
        }

        let Ok(url) = Url::parse(resource) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };

        match host.trim_start_matches("www.") {
            "youtube.com" | "m.youtube.com" | "music.youtube.com" => {
                url.path() == "/watch" || url.path().starts_with("/shorts/")
            }
            "youtu.be" => url.path().len() > 1,
            _ => false,
        }
    }

    async fn video_info(
        &self,
        resource: &str,
        credential: Option<&Credential>,
    ) -> Result<VideoMetadata, CatalogError> {
        let url = Self::watch_url(resource);
        tracing::debug!("Resolving formats for {url}");

        let mut command = tokio::process::Command::new(&self.binary);
        command
            .arg("--dump-json")
            .arg("--no-warnings")
            .arg("--no-playlist");

        if let Some(credential) = credential {
            command
                .arg("--add-header")
                .arg(format!("Cookie:{}", credential.as_str()));
        }

        let output = command
            .arg(&url)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CatalogError::LookupFailed {
                reason: format!("failed to execute {}: {e}", self.binary.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!("Catalog lookup for {url} failed: {}", stderr.trim());
            return Err(classify_failure(&stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let metadata = parse_video_info(&stdout)?;
        tracing::info!(
            "Resolved {} formats for \"{}\"",
            metadata.formats.len(),
            metadata.title
        );
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;

    fn catalog() -> YtDlpCatalog {
        YtDlpCatalog::new(&CatalogConfig::default())
    }

    #[test]
    fn test_validate_accepts_ids_and_watch_urls() {
        let catalog = catalog();

        assert!(catalog.validate("dQw4w9WgXcQ"));
        assert!(catalog.validate("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(catalog.validate("https://youtu.be/dQw4w9WgXcQ"));
        assert!(catalog.validate("https://m.youtube.com/watch?v=dQw4w9WgXcQ"));

        assert!(!catalog.validate(""));
        assert!(!catalog.validate("not a url"));
        assert!(!catalog.validate("https://example.com/watch?v=dQw4w9WgXcQ"));
        assert!(!catalog.validate("https://youtu.be/"));
    }

    #[test]
    fn test_watch_url_expands_bare_ids() {
        assert_eq!(
            YtDlpCatalog::watch_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            YtDlpCatalog::watch_url("https://youtu.be/dQw4w9WgXcQ"),
            "https://youtu.be/dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure("ERROR: Video unavailable"),
            CatalogError::ResourceUnavailable
        ));
        assert!(matches!(
            classify_failure("ERROR: Private video"),
            CatalogError::AccessRestricted
        ));
        assert!(matches!(
            classify_failure("ERROR: Sign in to confirm your age"),
            CatalogError::AccessRestricted
        ));
        assert!(matches!(
            classify_failure("ERROR: something else entirely"),
            CatalogError::LookupFailed { .. }
        ));
    }

    #[test]
    fn test_parse_video_info() {
        let raw = r#"{
            "id": "dQw4w9WgXcQ",
            "title": "Test Video",
            "uploader": "Test Channel",
            "duration": 212.4,
            "view_count": 1000,
            "thumbnail": "https://i.example/thumb.jpg",
            "formats": [
                {"format_id": "18", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a",
                 "format_note": "360p", "height": 360, "abr": 96.0, "filesize": 1000,
                 "url": "https://origin.example/18"},
                {"format_id": "137", "ext": "mp4", "vcodec": "avc1", "acodec": "none",
                 "height": 1080, "url": "https://origin.example/137"},
                {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a",
                 "abr": 129.5, "url": "https://origin.example/140"},
                {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none"}
            ]
        }"#;

        let metadata = parse_video_info(raw).unwrap();
        assert_eq!(metadata.title, "Test Video");
        assert_eq!(metadata.author, "Test Channel");
        assert_eq!(metadata.duration_seconds, 212);
        assert_eq!(metadata.resource_id, "dQw4w9WgXcQ");

        // The storyboard format carries neither stream and is dropped.
        assert_eq!(metadata.formats.len(), 3);

        let muxed = &metadata.formats[0];
        assert_eq!(muxed.kind, StreamKind::MuxedAv);
        assert_eq!(muxed.quality_label.as_deref(), Some("360p"));
        assert_eq!(muxed.audio_bitrate_kbps, Some(96));
        assert_eq!(muxed.content_length, Some(1000));

        let video_only = &metadata.formats[1];
        assert_eq!(video_only.kind, StreamKind::VideoOnly);
        assert_eq!(video_only.quality_label.as_deref(), Some("1080p"));

        let audio_only = &metadata.formats[2];
        assert_eq!(audio_only.kind, StreamKind::AudioOnly);
        assert_eq!(audio_only.audio_bitrate_kbps, Some(130));
    }

    #[test]
    fn test_parse_rejects_malformed_output() {
        assert!(matches!(
            parse_video_info("not json"),
            Err(CatalogError::LookupFailed { .. })
        ));
    }
}
