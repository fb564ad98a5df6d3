//! Centralized configuration for Grapnel.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;

/// Central configuration for all Grapnel components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct GrapnelConfig {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub catalog: CatalogConfig,
    pub remux: RemuxConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the API server binds to
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Upstream stream fetching configuration.
///
/// Controls the HTTP client used to pull format payloads from the remote
/// origin and how far the response streamer reads ahead of the client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent sent with upstream requests
    pub user_agent: &'static str,
    /// Number of chunks the response streamer buffers ahead of the consumer
    pub readahead_chunks: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "grapnel/0.1.0",
            readahead_chunks: 8,
        }
    }
}

/// Format catalog collaborator configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Path to the yt-dlp binary used for metadata resolution
    pub ytdlp_binary: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ytdlp_binary: PathBuf::from("yt-dlp"),
        }
    }
}

/// Remuxing and scratch storage configuration.
#[derive(Debug, Clone)]
pub struct RemuxConfig {
    /// Path to the ffmpeg binary used for stream-copy merging
    pub ffmpeg_binary: PathBuf,
    /// Directory for request-scoped ephemeral files
    pub scratch_dir: PathBuf,
}

impl Default for RemuxConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: PathBuf::from("ffmpeg"),
            scratch_dir: std::env::temp_dir().join("grapnel"),
        }
    }
}

impl GrapnelConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("GRAPNEL_BIND_ADDRESS") {
            if !addr.is_empty() {
                config.server.bind_address = addr;
            }
        }

        if let Ok(dir) = std::env::var("GRAPNEL_SCRATCH_DIR") {
            if !dir.is_empty() {
                config.remux.scratch_dir = PathBuf::from(dir);
            }
        }

        if let Ok(bin) = std::env::var("GRAPNEL_YTDLP_BINARY") {
            if !bin.is_empty() {
                config.catalog.ytdlp_binary = PathBuf::from(bin);
            }
        }

        if let Ok(bin) = std::env::var("GRAPNEL_FFMPEG_BINARY") {
            if !bin.is_empty() {
                config.remux.ffmpeg_binary = PathBuf::from(bin);
            }
        }

        if let Ok(chunks) = std::env::var("GRAPNEL_READAHEAD_CHUNKS") {
            if let Ok(count) = chunks.parse::<usize>() {
                config.fetch.readahead_chunks = count.max(1);
            }
        }

        config
    }

    /// Creates a configuration suitable for tests: scratch files go to a
    /// caller-provided directory instead of the shared system temp dir.
    pub fn for_testing(scratch_dir: PathBuf) -> Self {
        Self {
            remux: RemuxConfig {
                scratch_dir,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = GrapnelConfig::default();

        assert_eq!(config.server.bind_address, "127.0.0.1:3000");
        assert_eq!(config.fetch.user_agent, "grapnel/0.1.0");
        assert_eq!(config.fetch.readahead_chunks, 8);
        assert_eq!(config.catalog.ytdlp_binary, PathBuf::from("yt-dlp"));
        assert_eq!(config.remux.ffmpeg_binary, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_testing_config_scratch_dir() {
        let config = GrapnelConfig::for_testing(PathBuf::from("/tmp/grapnel-test"));
        assert_eq!(config.remux.scratch_dir, PathBuf::from("/tmp/grapnel-test"));
        assert_eq!(config.server.bind_address, "127.0.0.1:3000");
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("GRAPNEL_BIND_ADDRESS", "0.0.0.0:8080");
            std::env::set_var("GRAPNEL_SCRATCH_DIR", "/var/tmp/grapnel");
            std::env::set_var("GRAPNEL_READAHEAD_CHUNKS", "16");
        }

        let config = GrapnelConfig::from_env();

        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.remux.scratch_dir, PathBuf::from("/var/tmp/grapnel"));
        assert_eq!(config.fetch.readahead_chunks, 16);

        // Cleanup
        unsafe {
            std::env::remove_var("GRAPNEL_BIND_ADDRESS");
            std::env::remove_var("GRAPNEL_SCRATCH_DIR");
            std::env::remove_var("GRAPNEL_READAHEAD_CHUNKS");
        }
    }

    #[test]
    fn test_readahead_override_never_zero() {
        unsafe {
            std::env::set_var("GRAPNEL_READAHEAD_CHUNKS", "0");
        }

        let config = GrapnelConfig::from_env();
        assert_eq!(config.fetch.readahead_chunks, 1);

        unsafe {
            std::env::remove_var("GRAPNEL_READAHEAD_CHUNKS");
        }
    }
}
