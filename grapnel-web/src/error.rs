//! Error-to-response mapping for the HTTP API.
//!
//! Core errors are caught here and translated into the status taxonomy.
//! Internal diagnostic detail is logged, never returned to the caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use grapnel_core::catalog::CatalogError;
use grapnel_core::download::DownloadError;
use serde_json::json;

/// API-facing error wrapper.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub DownloadError);

impl ApiError {
    /// Shorthand for a 400-class request validation failure.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self(DownloadError::InvalidRequest {
            reason: reason.into(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match &self.0 {
            DownloadError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            DownloadError::Catalog(CatalogError::ResourceUnavailable) => StatusCode::NOT_FOUND,
            DownloadError::Catalog(CatalogError::AccessRestricted) => StatusCode::FORBIDDEN,
            DownloadError::Catalog(CatalogError::InvalidResource { .. }) => {
                StatusCode::BAD_REQUEST
            }
            DownloadError::Catalog(CatalogError::LookupFailed { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DownloadError::Selection(_) => StatusCode::NOT_FOUND,
            DownloadError::VideoFetchFailed { .. }
            | DownloadError::AudioFetchFailed { .. }
            | DownloadError::Fetch(_)
            | DownloadError::Merge(_)
            | DownloadError::OutputReadFailed { .. }
            | DownloadError::Scratch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Full detail goes to the log; the caller only sees the sanitized
        // message.
        if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self.0);
        } else {
            tracing::debug!("Request rejected: {:?}", self.0);
        }

        (status, Json(json!({ "error": self.0.user_message() }))).into_response()
    }
}
