use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use tracing::debug;

use super::TextToSpeech;
use crate::config::TtsConfig;
use crate::error::{DubflowError, Result};

/// OpenAI-compatible speech synthesis client producing WAV output.
pub struct OpenAiSpeech {
    config: TtsConfig,
    client: reqwest::Client,
}

impl OpenAiSpeech {
    pub fn new(config: TtsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TextToSpeech for OpenAiSpeech {
    async fn synthesize(&self, text: &str, voice: &str, out_wav: &Path) -> Result<()> {
        debug!(voice, "synthesizing {} characters", text.chars().count());

        let response = self
            .client
            .post(format!("{}/audio/speech", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "model": self.config.model,
                "voice": voice,
                "input": text,
                "response_format": "wav",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DubflowError::Speech(format!(
                "speech API returned {}: {}",
                status, body
            )));
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(out_wav, &bytes).await?;
        Ok(())
    }
}
