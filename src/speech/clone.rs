use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::VoiceCloner;
use crate::config::TtsConfig;
use crate::error::{DubflowError, Result};

/// Voice-clone registration over a plain HTTP JSON endpoint. The service
/// fetches the sample from `audio_url` and answers with the new voice code.
pub struct HttpVoiceCloner {
    config: TtsConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CloneResponse {
    voice_code: String,
}

impl HttpVoiceCloner {
    pub fn new(config: TtsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl VoiceCloner for HttpVoiceCloner {
    async fn clone_voice(&self, prefix: &str, audio_url: &str) -> Result<String> {
        if self.config.clone_endpoint.is_empty() {
            return Err(DubflowError::Speech(
                "voice clone endpoint is not configured".to_string(),
            ));
        }

        let response = self
            .client
            .post(&self.config.clone_endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "prefix": prefix,
                "audio_url": audio_url,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DubflowError::Speech(format!(
                "voice clone returned {}: {}",
                status, body
            )));
        }

        let parsed: CloneResponse = response
            .json()
            .await
            .map_err(|e| DubflowError::Speech(format!("unreadable clone response: {}", e)))?;

        info!(voice_code = %parsed.voice_code, "registered cloned voice");
        Ok(parsed.voice_code)
    }
}
