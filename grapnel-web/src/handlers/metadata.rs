//! Metadata endpoint.

use axum::extract::{Json, State};
use grapnel_core::catalog::{Credential, VideoMetadata};
use serde::Deserialize;

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct MetadataBody {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

pub async fn metadata(
    State(state): State<AppState>,
    Json(body): Json<MetadataBody>,
) -> Result<Json<VideoMetadata>, ApiError> {
    let url = body
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::invalid_request("URL is required"))?;

    let credential = body
        .credential
        .filter(|token| !token.is_empty())
        .map(Credential::new);

    let info = state.download.metadata(&url, credential.as_ref()).await?;
    Ok(Json(info))
}
