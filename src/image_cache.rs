use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::ImgurConfig;
use crate::error::BotError;
use crate::fetcher::Fetcher;
use crate::store::Store;

/// External host that turns raw image bytes into a shareable link.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, image: &[u8]) -> Result<String>;
}

/// Anonymous Imgur uploads authenticated with an application client ID.
pub struct ImgurHost {
    client: reqwest::Client,
    config: ImgurConfig,
}

#[derive(Debug, Deserialize)]
struct ImgurResponse {
    data: ImgurImage,
    success: bool,
}

#[derive(Debug, Deserialize)]
struct ImgurImage {
    link: Option<String>,
}

impl ImgurHost {
    pub fn new(config: ImgurConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ImageHost for ImgurHost {
    async fn upload(&self, image: &[u8]) -> Result<String> {
        let url = format!("{}/3/image", self.config.api_base.trim_end_matches('/'));
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Client-ID {}", self.config.client_id))
            .form(&[("image", encoded.as_str()), ("type", "base64")])
            .send()
            .await
            .context("Failed to send upload request to Imgur")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Imgur API error ({}): {}", status, error_body);
        }

        let body: ImgurResponse = response
            .json()
            .await
            .context("Failed to parse Imgur response")?;
        if !body.success {
            anyhow::bail!("Imgur reported an unsuccessful upload");
        }
        body.data.link.context("Imgur response has no link")
    }
}

/// Memoizing gateway from `(category, key)` to a share link.
///
/// The miss path holds no lock: two concurrent misses for one key both upload
/// and the later write replaces the earlier link.
#[derive(Clone)]
pub struct ImageCache {
    store: Store,
    fetcher: Fetcher,
    host: Option<Arc<dyn ImageHost>>,
}

impl ImageCache {
    pub fn new(store: Store, fetcher: Fetcher, host: Option<Arc<dyn ImageHost>>) -> Self {
        Self {
            store,
            fetcher,
            host,
        }
    }

    /// Share link for the image, or `None` if it could not be obtained.
    /// Callers fall back to sending `source_url` as text.
    pub async fn resolve(&self, category: &str, key: &str, source_url: &str) -> Option<String> {
        match self.try_resolve(category, key, source_url).await {
            Ok(link) => Some(link),
            Err(e) => {
                warn!("Image resolution for {}/{} failed: {}", category, key, e);
                None
            }
        }
    }

    async fn try_resolve(
        &self,
        category: &str,
        key: &str,
        source_url: &str,
    ) -> Result<String, BotError> {
        let cached = self
            .store
            .image_link(category, key)
            .await
            .map_err(|e| BotError::ImageResolution(format!("{:#}", e)))?;
        if let Some(link) = cached {
            debug!("Image cache hit: {}/{}", category, key);
            return Ok(link);
        }

        let host = self
            .host
            .as_ref()
            .ok_or_else(|| BotError::ImageResolution("no image host configured".to_string()))?;

        let image = self
            .fetcher
            .image_bytes(source_url)
            .await
            .map_err(|e| BotError::ImageResolution(e.to_string()))?;
        let link = host
            .upload(&image)
            .await
            .map_err(|e| BotError::ImageResolution(format!("{:#}", e)))?;

        self.store
            .store_image_link(category, key, &link)
            .await
            .map_err(|e| BotError::ImageResolution(format!("{:#}", e)))?;

        info!("Cached image {}/{} -> {}", category, key, link);
        Ok(link)
    }
}
