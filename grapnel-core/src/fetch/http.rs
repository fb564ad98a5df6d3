//! Production stream fetcher over HTTP.
//!
//! Pulls a format's payload from its direct origin URL with reqwest. The
//! caller-supplied credential is forwarded verbatim as a Cookie header.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header;

use super::{ByteStream, FetchError, StreamFetcher};
use crate::catalog::{Credential, FormatDescriptor};
use crate::config::FetchConfig;

/// HTTP stream fetcher backed by a shared reqwest client.
pub struct HttpStreamFetcher {
    client: reqwest::Client,
}

impl HttpStreamFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| FetchError::Transfer {
                reason: format!("failed to build http client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StreamFetcher for HttpStreamFetcher {
    async fn open(
        &self,
        resource: &str,
        format: &FormatDescriptor,
        credential: Option<&Credential>,
    ) -> Result<ByteStream, FetchError> {
        let url = format
            .source_url
            .as_deref()
            .ok_or_else(|| FetchError::MissingSourceUrl {
                id: format.id.clone(),
            })?;

        tracing::debug!("Opening upstream stream for {resource} format {}", format.id);

        let mut request = self.client.get(url);
        if let Some(credential) = credential {
            request = request.header(header::COOKIE, credential.as_str());
        }

        let response = request.send().await.map_err(|e| FetchError::Transfer {
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                "Upstream refused format {} of {resource}: {status}",
                format.id
            );
            return Err(FetchError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        let stream = response
            .bytes_stream()
            .map_err(|e| FetchError::Transfer {
                reason: e.to_string(),
            });

        Ok(Box::pin(stream))
    }
}
