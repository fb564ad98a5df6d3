//! Grapnel Core - Remote video fetch, selection, and remux orchestration
//!
//! This crate provides the fundamental building blocks for downloading
//! remotely hosted video: the format catalog boundary, the selection policy
//! that picks which remote format(s) satisfy a request, stream fetching and
//! materialization to scratch storage, ffmpeg-based remuxing, and the
//! pull-based response stream adapter.

pub mod catalog;
pub mod config;
pub mod download;
pub mod fetch;
pub mod streaming;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use catalog::{CatalogError, Credential, FormatCatalog, FormatDescriptor, VideoMetadata};
pub use config::GrapnelConfig;
pub use download::{DownloadError, DownloadRequest, DownloadService};
pub use fetch::{FetchError, StreamFetcher};

/// Core errors that can bubble up from any Grapnel subsystem.
#[derive(Debug, thiserror::Error)]
pub enum GrapnelError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GrapnelError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            GrapnelError::Catalog(e) => match e {
                CatalogError::ResourceUnavailable => {
                    "Video is unavailable or private".to_string()
                }
                CatalogError::AccessRestricted => {
                    "This video cannot be accessed without authorization".to_string()
                }
                CatalogError::InvalidResource { reason } => {
                    format!("Invalid video identifier: {reason}")
                }
                CatalogError::LookupFailed { .. } => {
                    "Failed to fetch video information".to_string()
                }
            },
            GrapnelError::Download(e) => e.user_message(),
            GrapnelError::Fetch(_) => "Upstream transfer failed".to_string(),
            GrapnelError::Configuration { reason } => format!("Configuration error: {reason}"),
            GrapnelError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            GrapnelError::Configuration { .. }
                | GrapnelError::Catalog(CatalogError::InvalidResource { .. })
                | GrapnelError::Download(DownloadError::InvalidRequest { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, GrapnelError>;
