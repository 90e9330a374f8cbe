//! Object store port used to publish voice-clone source audio.

use async_trait::async_trait;
use std::path::Path;

use crate::config::StoreConfig;
use crate::error::{DubflowError, Result};

/// Port over object storage backends.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, key: &str, local: &Path, bucket: &str) -> Result<()>;

    /// Public URL under which an uploaded object is reachable.
    fn object_url(&self, key: &str) -> String;
}

/// S3-style path-addressed store speaking plain authenticated HTTP PUT.
pub struct HttpObjectStore {
    config: StoreConfig,
    client: reqwest::Client,
}

impl HttpObjectStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    fn object_endpoint(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            bucket,
            key
        )
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(&self, key: &str, local: &Path, bucket: &str) -> Result<()> {
        if self.config.endpoint.is_empty() {
            return Err(DubflowError::Store(
                "object store endpoint is not configured".to_string(),
            ));
        }

        let body = tokio::fs::read(local).await?;
        let response = self
            .client
            .put(self.object_endpoint(bucket, key))
            .basic_auth(&self.config.access_key, Some(&self.config.secret_key))
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DubflowError::Store(format!(
                "upload of {} returned {}: {}",
                key, status, body
            )));
        }

        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        self.object_endpoint(&self.config.bucket, key)
    }
}
