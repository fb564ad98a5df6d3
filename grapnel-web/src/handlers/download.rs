//! Download endpoint.
//!
//! Validates the request body, hands it to the download service, and turns
//! the delivery into an attachment response. Pass-through downloads stream;
//! combine downloads arrive fully buffered.

use axum::body::Body;
use axum::extract::{Json, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use grapnel_core::catalog::Credential;
use grapnel_core::download::{DeliveryBody, DownloadMode, DownloadRequest};
use serde::Deserialize;

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadBody {
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// Explicit format id; clients send itag-style numbers, but opaque
    /// string ids are accepted too
    #[serde(default)]
    pub itag: Option<FormatIdParam>,
    #[serde(default)]
    pub combine_streams: Option<bool>,
    #[serde(default)]
    pub credential: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FormatIdParam {
    Number(u64),
    Text(String),
}

impl FormatIdParam {
    fn into_id(self) -> String {
        match self {
            FormatIdParam::Number(n) => n.to_string(),
            FormatIdParam::Text(s) => s,
        }
    }
}

pub async fn download(
    State(state): State<AppState>,
    Json(body): Json<DownloadBody>,
) -> Result<Response, ApiError> {
    let resource_id = body
        .resource_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::invalid_request("Video ID and format are required"))?;
    let format = body
        .format
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::invalid_request("Video ID and format are required"))?;

    let mode = DownloadMode::parse_label(&format)
        .ok_or_else(|| ApiError::invalid_request("Unsupported format"))?;

    let request = DownloadRequest {
        resource_id,
        mode,
        explicit_format_id: body.itag.map(FormatIdParam::into_id),
        combine: mode == DownloadMode::MuxedVideo && body.combine_streams.unwrap_or(false),
        credential: body
            .credential
            .filter(|token| !token.is_empty())
            .map(Credential::new),
    };

    let delivery = state.download.download(&request).await?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, delivery.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", delivery.file_name),
        );
    if let Some(length) = delivery.content_length {
        builder = builder.header(header::CONTENT_LENGTH, length.to_string());
    }

    let body = match delivery.body {
        DeliveryBody::Streamed(stream) => Body::from_stream(stream),
        DeliveryBody::Buffered(bytes) => Body::from(bytes),
    };

    Ok(builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}
