//! External muxer invocation and merge job state.
//!
//! Merging is container-level repackaging only: both elementary streams are
//! stream-copied into the target container, never re-encoded.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::RemuxConfig;

/// Codec settings for a merge invocation.
#[derive(Debug, Clone)]
pub struct MuxOptions {
    /// Video codec: "copy" repackages without re-encoding
    pub video_codec: String,
    /// Audio codec: "copy" repackages without re-encoding
    pub audio_codec: String,
}

impl Default for MuxOptions {
    fn default() -> Self {
        Self {
            video_codec: "copy".to_string(),
            audio_codec: "copy".to_string(),
        }
    }
}

/// Errors from the muxer collaborator.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The muxer process ran and failed.
    #[error("muxer process failed: {reason}")]
    ProcessFailed { reason: String },

    /// The muxer binary could not be executed at all.
    #[error("muxer binary unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// External collaborator that merges a video file and an audio file into one
/// output container.
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Merges `video` and `audio` into `output` in the given container.
    ///
    /// # Errors
    ///
    /// - `MergeError::ProcessFailed` - muxer ran and exited with an error
    /// - `MergeError::Unavailable` - muxer binary could not be started
    async fn merge(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        options: &MuxOptions,
        container: &str,
    ) -> Result<(), MergeError>;

    /// Check if the muxer is available and properly configured
    fn is_available(&self) -> bool;
}

/// Lifecycle of one combine request's merge work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    Pending,
    Materializing,
    Merging,
    Done,
    Failed,
}

/// Request-scoped merge bookkeeping.
///
/// Owned exclusively by the orchestrator handling the request; by the time
/// the job reaches `Done` or `Failed` its files have been deleted.
#[derive(Debug)]
pub struct MergeJob {
    pub video_path: PathBuf,
    pub audio_path: PathBuf,
    pub output_path: PathBuf,
    pub state: MergeState,
}

impl MergeJob {
    pub fn new(video_path: PathBuf, audio_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            video_path,
            audio_path,
            output_path,
            state: MergeState::Pending,
        }
    }

    pub fn advance(&mut self, state: MergeState) {
        tracing::debug!(
            "Merge job {:?} -> {state:?} (output {})",
            self.state,
            self.output_path.display()
        );
        self.state = state;
    }
}

/// Production muxer shelling out to the ffmpeg binary.
pub struct FfmpegMuxer {
    binary: PathBuf,
}

impl FfmpegMuxer {
    pub fn new(config: &RemuxConfig) -> Self {
        Self {
            binary: config.ffmpeg_binary.clone(),
        }
    }

    /// Verify ffmpeg installation by running its version command.
    fn verify_installation(&self) -> Result<(), MergeError> {
        let result = std::process::Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match result {
            Ok(status) if status.success() => Ok(()),
            Ok(_) => Err(MergeError::Unavailable {
                reason: "ffmpeg binary found but returned error".to_string(),
            }),
            Err(_) => Err(MergeError::Unavailable {
                reason: "ffmpeg binary not found in PATH".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn merge(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        options: &MuxOptions,
        container: &str,
    ) -> Result<(), MergeError> {
        tracing::info!(
            "Merging {} + {} -> {}",
            video.display(),
            audio.display(),
            output.display()
        );

        let mut command = tokio::process::Command::new(&self.binary);
        command
            .arg("-hide_banner")
            .arg("-nostats")
            .arg("-loglevel")
            .arg("error")
            .arg("-y") // Overwrite output file
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .arg("-c:v")
            .arg(&options.video_codec)
            .arg("-c:a")
            .arg(&options.audio_codec)
            // Select the muxer explicitly; the output path's extension is
            // not authoritative for the container choice.
            .arg("-f")
            .arg(container)
            .arg(output)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let result = command.output().await.map_err(|e| {
            tracing::error!("Failed to execute ffmpeg: {e}");
            MergeError::Unavailable {
                reason: format!("failed to execute ffmpeg: {e}"),
            }
        })?;

        let stderr = String::from_utf8_lossy(&result.stderr);
        if !stderr.is_empty() {
            tracing::warn!("ffmpeg stderr: {}", stderr.trim());
        }

        if !result.status.success() {
            tracing::error!("ffmpeg failed with exit code {}", result.status);
            return Err(MergeError::ProcessFailed {
                reason: format!("ffmpeg exited with {}: {}", result.status, stderr.trim()),
            });
        }

        let output_size = tokio::fs::metadata(output).await?.len();
        if output_size == 0 {
            return Err(MergeError::ProcessFailed {
                reason: "ffmpeg produced an empty output file".to_string(),
            });
        }

        tracing::info!("Merge complete: {output_size} bytes");
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.verify_installation().is_ok()
    }
}

/// Simulation muxer for tests and development.
///
/// Concatenates the video and audio payloads into the output file, which is
/// deterministic and needs no external binary. Can be configured to fail to
/// exercise merge-failure handling.
pub struct SimulationMuxer {
    fail: bool,
}

impl SimulationMuxer {
    pub fn new() -> Self {
        Self { fail: false }
    }

    /// Makes every merge fail as if the subprocess had errored.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Default for SimulationMuxer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Muxer for SimulationMuxer {
    async fn merge(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        _options: &MuxOptions,
        _container: &str,
    ) -> Result<(), MergeError> {
        if self.fail {
            return Err(MergeError::ProcessFailed {
                reason: "simulated muxer failure".to_string(),
            });
        }

        let mut merged = tokio::fs::read(video).await?;
        merged.extend(tokio::fs::read(audio).await?);
        tokio::fs::write(output, merged).await?;
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mux_options_default_to_stream_copy() {
        let options = MuxOptions::default();
        assert_eq!(options.video_codec, "copy");
        assert_eq!(options.audio_codec, "copy");
    }

    #[test]
    fn test_merge_job_state_transitions() {
        let mut job = MergeJob::new(
            PathBuf::from("/tmp/v.mp4"),
            PathBuf::from("/tmp/a.m4a"),
            PathBuf::from("/tmp/out.mp4"),
        );
        assert_eq!(job.state, MergeState::Pending);

        job.advance(MergeState::Materializing);
        job.advance(MergeState::Merging);
        job.advance(MergeState::Done);
        assert_eq!(job.state, MergeState::Done);
    }

    #[tokio::test]
    async fn test_simulation_muxer_concatenates_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("v.mp4");
        let audio = dir.path().join("a.m4a");
        let output = dir.path().join("out.mp4");
        tokio::fs::write(&video, b"VIDEO").await.unwrap();
        tokio::fs::write(&audio, b"AUDIO").await.unwrap();

        let muxer = SimulationMuxer::new();
        muxer
            .merge(&video, &audio, &output, &MuxOptions::default(), "mp4")
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"VIDEOAUDIO");
    }

    #[tokio::test]
    async fn test_simulation_muxer_failure_injection() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("v.mp4");
        let audio = dir.path().join("a.m4a");
        let output = dir.path().join("out.mp4");
        tokio::fs::write(&video, b"VIDEO").await.unwrap();
        tokio::fs::write(&audio, b"AUDIO").await.unwrap();

        let muxer = SimulationMuxer::new().failing();
        let result = muxer
            .merge(&video, &audio, &output, &MuxOptions::default(), "mp4")
            .await;

        assert!(matches!(result, Err(MergeError::ProcessFailed { .. })));
        assert!(!output.exists());
    }
}
