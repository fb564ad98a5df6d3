//! Format selection policy.
//!
//! Pure decision logic: given the catalog's descriptor list and a download
//! request, pick the one or two formats that satisfy it. No side effects, no
//! mutable state; identical inputs always produce identical results.

use thiserror::Error;

use super::{DownloadMode, DownloadRequest};
use crate::catalog::{FormatDescriptor, StreamKind};

/// Outcome of format selection.
///
/// `secondary` is populated only when a combine decision requires a separate
/// audio source; in that case `primary` is the video source.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    pub primary: FormatDescriptor,
    pub secondary: Option<FormatDescriptor>,
}

/// Selection failures; both map to "format not found" at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// An explicitly requested format id is not in the descriptor list.
    #[error("no format matches id {id}")]
    ExplicitIdMissing { id: String },

    /// No advertised format satisfies the requested mode.
    #[error("no suitable format found")]
    NoCandidate,
}

/// Chooses the format(s) satisfying a request.
///
/// An explicit format id always wins over heuristics and is returned alone,
/// regardless of mode. Heuristic selection ranks by quality label (video) or
/// audio bitrate (audio); ties preserve the original descriptor order, so
/// earlier entries win.
pub fn select(
    descriptors: &[FormatDescriptor],
    request: &DownloadRequest,
) -> Result<SelectionResult, SelectionError> {
    if let Some(id) = &request.explicit_format_id {
        let chosen = descriptors
            .iter()
            .find(|descriptor| &descriptor.id == id)
            .ok_or_else(|| SelectionError::ExplicitIdMissing { id: id.clone() })?;
        return Ok(SelectionResult {
            primary: chosen.clone(),
            secondary: None,
        });
    }

    match request.mode {
        DownloadMode::AudioOnly => {
            let primary = best_audio(descriptors).ok_or(SelectionError::NoCandidate)?;
            Ok(SelectionResult {
                primary: primary.clone(),
                secondary: None,
            })
        }
        DownloadMode::VideoOnly => {
            let primary = best_by(descriptors, |d| d.kind == StreamKind::VideoOnly, quality)
                .or_else(|| best_by(descriptors, |d| d.kind.has_video(), quality))
                .ok_or(SelectionError::NoCandidate)?;
            Ok(SelectionResult {
                primary: primary.clone(),
                secondary: None,
            })
        }
        DownloadMode::MuxedVideo if request.combine => {
            // Video-only formats reach qualities the origin never offers
            // pre-combined, so they are preferred as the video source.
            let primary = best_by(descriptors, |d| d.kind == StreamKind::VideoOnly, quality)
                .or_else(|| best_by(descriptors, |d| d.kind.has_video(), quality))
                .ok_or(SelectionError::NoCandidate)?;

            // Combine always takes the two-stream path, so a missing audio
            // source fails the whole selection even if the primary happens
            // to carry audio.
            let secondary = best_audio(descriptors).ok_or(SelectionError::NoCandidate)?;

            Ok(SelectionResult {
                primary: primary.clone(),
                secondary: Some(secondary.clone()),
            })
        }
        DownloadMode::MuxedVideo => {
            let primary = best_by(descriptors, |d| d.kind == StreamKind::MuxedAv, quality)
                .ok_or(SelectionError::NoCandidate)?;
            Ok(SelectionResult {
                primary: primary.clone(),
                secondary: None,
            })
        }
    }
}

fn quality(descriptor: &FormatDescriptor) -> u32 {
    descriptor.quality_value()
}

fn bitrate(descriptor: &FormatDescriptor) -> u32 {
    descriptor.bitrate_value()
}

/// Audio-only formats ranked by bitrate, falling back to anything that
/// carries audio.
fn best_audio(descriptors: &[FormatDescriptor]) -> Option<&FormatDescriptor> {
    best_by(descriptors, |d| d.kind == StreamKind::AudioOnly, bitrate)
        .or_else(|| best_by(descriptors, |d| d.kind.has_audio(), bitrate))
}

/// Highest-scoring descriptor among those matching the predicate.
///
/// Strictly-greater comparison keeps the earliest descriptor on ties, which
/// is what makes the ordering stable.
fn best_by<'a>(
    descriptors: &'a [FormatDescriptor],
    keep: impl Fn(&FormatDescriptor) -> bool,
    score: impl Fn(&FormatDescriptor) -> u32,
) -> Option<&'a FormatDescriptor> {
    let mut best: Option<(&FormatDescriptor, u32)> = None;
    for descriptor in descriptors.iter().filter(|d| keep(d)) {
        let value = score(descriptor);
        let replace = match best {
            Some((_, best_value)) => value > best_value,
            None => true,
        };
        if replace {
            best = Some((descriptor, value));
        }
    }
    best.map(|(descriptor, _)| descriptor)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::catalog::Credential;

    fn request(mode: DownloadMode, combine: bool) -> DownloadRequest {
        DownloadRequest {
            resource_id: "dQw4w9WgXcQ".to_string(),
            mode,
            explicit_format_id: None,
            combine,
            credential: None,
        }
    }

    fn muxed(id: &str, label: &str) -> FormatDescriptor {
        FormatDescriptor::new(id, "mp4", true, true).with_quality_label(label)
    }

    fn video_only(id: &str, label: &str) -> FormatDescriptor {
        FormatDescriptor::new(id, "mp4", true, false).with_quality_label(label)
    }

    fn audio_only(id: &str, kbps: u32) -> FormatDescriptor {
        FormatDescriptor::new(id, "m4a", false, true).with_audio_bitrate(kbps)
    }

    #[test]
    fn test_combine_prefers_video_only_plus_audio_only() {
        // Scenario: a 720p muxed format, a 1080p video-only format, and a
        // 160kbps audio-only format. Combine should pair the latter two.
        let descriptors = vec![
            muxed("1", "720p"),
            video_only("2", "1080p"),
            audio_only("3", 160),
        ];

        let selection = select(&descriptors, &request(DownloadMode::MuxedVideo, true)).unwrap();
        assert_eq!(selection.primary.id, "2");
        assert_eq!(selection.secondary.unwrap().id, "3");
    }

    #[test]
    fn test_audio_only_falls_back_to_muxed_formats() {
        // Only muxed formats advertised: the audio request falls back to the
        // one with the highest audio bitrate.
        let descriptors = vec![
            muxed("1", "360p").with_audio_bitrate(96),
            muxed("2", "720p").with_audio_bitrate(192),
        ];

        let selection = select(&descriptors, &request(DownloadMode::AudioOnly, false)).unwrap();
        assert_eq!(selection.primary.id, "2");
        assert!(selection.secondary.is_none());
    }

    #[test]
    fn test_explicit_id_wins_over_heuristics() {
        let descriptors = vec![muxed("1", "1080p"), muxed("2", "144p")];

        let mut explicit = request(DownloadMode::MuxedVideo, false);
        explicit.explicit_format_id = Some("2".to_string());

        let selection = select(&descriptors, &explicit).unwrap();
        assert_eq!(selection.primary.id, "2");
        assert!(selection.secondary.is_none());
    }

    #[test]
    fn test_explicit_id_absent_fails() {
        let descriptors = vec![muxed("1", "1080p")];

        let mut explicit = request(DownloadMode::MuxedVideo, false);
        explicit.explicit_format_id = Some("999".to_string());

        assert_eq!(
            select(&descriptors, &explicit),
            Err(SelectionError::ExplicitIdMissing {
                id: "999".to_string()
            })
        );
    }

    #[test]
    fn test_muxed_without_combine_picks_best_muxed() {
        let descriptors = vec![
            video_only("1", "2160p"),
            muxed("2", "360p"),
            muxed("3", "720p"),
        ];

        let selection = select(&descriptors, &request(DownloadMode::MuxedVideo, false)).unwrap();
        assert_eq!(selection.primary.id, "3");
    }

    #[test]
    fn test_video_only_falls_back_to_any_video() {
        let descriptors = vec![muxed("1", "480p"), muxed("2", "720p")];

        let selection = select(&descriptors, &request(DownloadMode::VideoOnly, false)).unwrap();
        assert_eq!(selection.primary.id, "2");
    }

    #[test]
    fn test_combine_without_audio_source_fails() {
        // Even though a muxed primary would carry audio, combine demands a
        // separate audio source.
        let descriptors = vec![video_only("1", "1080p")];

        assert_eq!(
            select(&descriptors, &request(DownloadMode::MuxedVideo, true)),
            Err(SelectionError::NoCandidate)
        );
    }

    #[test]
    fn test_combine_falls_back_to_muxed_video_source() {
        let descriptors = vec![muxed("1", "720p"), audio_only("2", 128)];

        let selection = select(&descriptors, &request(DownloadMode::MuxedVideo, true)).unwrap();
        assert_eq!(selection.primary.id, "1");
        assert_eq!(selection.secondary.unwrap().id, "2");
    }

    #[test]
    fn test_ties_preserve_descriptor_order() {
        let descriptors = vec![
            muxed("first", "720p"),
            muxed("second", "720p"),
            muxed("third", "720p"),
        ];

        let selection = select(&descriptors, &request(DownloadMode::MuxedVideo, false)).unwrap();
        assert_eq!(selection.primary.id, "first");
    }

    #[test]
    fn test_missing_labels_rank_as_zero() {
        let descriptors = vec![
            FormatDescriptor::new("unlabeled", "mp4", true, true),
            muxed("labeled", "144p"),
        ];

        let selection = select(&descriptors, &request(DownloadMode::MuxedVideo, false)).unwrap();
        assert_eq!(selection.primary.id, "labeled");
    }

    #[test]
    fn test_empty_descriptor_list_fails() {
        for mode in [
            DownloadMode::MuxedVideo,
            DownloadMode::AudioOnly,
            DownloadMode::VideoOnly,
        ] {
            assert_eq!(
                select(&[], &request(mode, false)),
                Err(SelectionError::NoCandidate)
            );
        }
    }

    fn descriptor_strategy() -> impl Strategy<Value = FormatDescriptor> {
        (
            "[a-z0-9]{1,4}",
            any::<bool>(),
            any::<bool>(),
            proptest::option::of(0u32..2500),
            proptest::option::of(0u32..320),
        )
            .prop_map(|(id, has_video, has_audio, height, kbps)| {
                let mut descriptor = FormatDescriptor::new(id, "mp4", has_video, has_audio);
                descriptor.quality_label = height.map(|h| format!("{h}p"));
                descriptor.audio_bitrate_kbps = kbps;
                descriptor
            })
    }

    fn request_strategy() -> impl Strategy<Value = DownloadRequest> {
        (
            prop_oneof![
                Just(DownloadMode::MuxedVideo),
                Just(DownloadMode::AudioOnly),
                Just(DownloadMode::VideoOnly),
            ],
            any::<bool>(),
            proptest::option::of("[a-z0-9]{1,4}"),
            any::<bool>(),
        )
            .prop_map(|(mode, combine, explicit_format_id, with_credential)| DownloadRequest {
                resource_id: "dQw4w9WgXcQ".to_string(),
                mode,
                explicit_format_id,
                combine,
                credential: with_credential.then(|| Credential::new("token")),
            })
    }

    proptest! {
        #[test]
        fn select_is_deterministic(
            descriptors in proptest::collection::vec(descriptor_strategy(), 0..12),
            request in request_strategy(),
        ) {
            prop_assert_eq!(
                select(&descriptors, &request),
                select(&descriptors, &request)
            );
        }

        #[test]
        fn combine_primary_always_has_video(
            descriptors in proptest::collection::vec(descriptor_strategy(), 0..12),
        ) {
            let request = DownloadRequest {
                resource_id: "dQw4w9WgXcQ".to_string(),
                mode: DownloadMode::MuxedVideo,
                explicit_format_id: None,
                combine: true,
                credential: None,
            };

            if let Ok(selection) = select(&descriptors, &request) {
                prop_assert!(selection.primary.has_video);
                prop_assert!(selection.secondary.is_some_and(|audio| audio.has_audio));
            }
        }
    }
}
