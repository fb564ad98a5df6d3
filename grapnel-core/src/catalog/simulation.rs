//! Simulation catalog for tests and development.
//!
//! Serves a fixed metadata record without touching the network, and can be
//! configured to fail with any catalog error to exercise the request
//! boundary's status mapping.

use async_trait::async_trait;

use super::{CatalogError, Credential, FormatCatalog, VideoMetadata};

/// In-memory catalog that returns canned metadata.
pub struct SimulationCatalog {
    metadata: VideoMetadata,
    failure: Option<CatalogError>,
}

impl SimulationCatalog {
    pub fn new(metadata: VideoMetadata) -> Self {
        Self {
            metadata,
            failure: None,
        }
    }

    /// Makes every lookup fail with the given error.
    pub fn failing(mut self, error: CatalogError) -> Self {
        self.failure = Some(error);
        self
    }
}

#[async_trait]
impl FormatCatalog for SimulationCatalog {
    fn validate(&self, resource: &str) -> bool {
        !resource.is_empty()
    }

    async fn video_info(
        &self,
        _resource: &str,
        _credential: Option<&Credential>,
    ) -> Result<VideoMetadata, CatalogError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        Ok(self.metadata.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FormatDescriptor;

    fn metadata() -> VideoMetadata {
        VideoMetadata {
            title: "Simulated".to_string(),
            thumbnail: String::new(),
            duration_seconds: 10,
            view_count: 1,
            author: "sim".to_string(),
            resource_id: "sim00000000".to_string(),
            formats: vec![FormatDescriptor::new("18", "mp4", true, true)],
        }
    }

    #[tokio::test]
    async fn test_simulation_catalog_returns_metadata() {
        let catalog = SimulationCatalog::new(metadata());
        let info = catalog.video_info("sim00000000", None).await.unwrap();
        assert_eq!(info.title, "Simulated");
        assert_eq!(info.formats.len(), 1);
    }

    #[tokio::test]
    async fn test_simulation_catalog_failure_injection() {
        let catalog = SimulationCatalog::new(metadata()).failing(CatalogError::AccessRestricted);
        let result = catalog.video_info("sim00000000", None).await;
        assert!(matches!(result, Err(CatalogError::AccessRestricted)));
    }
}
