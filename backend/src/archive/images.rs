//! Image retrieval for the brightness heuristic.

use async_trait::async_trait;
use image::DynamicImage;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::error::{ArchiveError, ArchiveResult, ErrorContext};
use crate::config::ArchiveSettings;
use crate::error::{DetectorError, DetectorResult};

/// Fetches and decodes one image per URL.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> DetectorResult<DynamicImage>;
}

/// Downloads images over HTTP.
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new(settings: &ArchiveSettings) -> ArchiveResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| {
                ArchiveError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> DetectorResult<DynamicImage> {
        let context = ErrorContext::new("fetch_image").with_details(url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ArchiveError::from(e).with_context(context.clone()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ArchiveError::not_found_with_context("image not found", context).into());
        }
        if !status.is_success() {
            return Err(ArchiveError::query_with_context(
                format!("image download returned {}", status),
                context,
            )
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ArchiveError::from(e).with_context(context))?;

        image::load_from_memory(&bytes).map_err(|source| DetectorError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Serves images held in memory, keyed by URL.
#[derive(Clone, Default)]
pub struct MemoryImageSource {
    images: Arc<RwLock<HashMap<String, DynamicImage>>>,
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, image: DynamicImage) {
        self.images.write().insert(url.into(), image);
    }

    pub fn len(&self) -> usize {
        self.images.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.read().is_empty()
    }
}

#[async_trait]
impl ImageSource for MemoryImageSource {
    async fn fetch(&self, url: &str) -> DetectorResult<DynamicImage> {
        self.images.read().get(url).cloned().ok_or_else(|| {
            ArchiveError::not_found_with_context(
                "image not found",
                ErrorContext::new("fetch_image").with_details(url),
            )
            .into()
        })
    }
}
