use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use super::{TranscriptionResult, Transcriber, Word};
use crate::config::TranscribeConfig;
use crate::error::{DubflowError, Result};

/// OpenAI-compatible transcription API client requesting word-level
/// timestamp granularity (`verbose_json`).
pub struct OpenAiTranscriber {
    config: TranscribeConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: String,
    #[serde(default)]
    words: Vec<VerboseWord>,
}

#[derive(Debug, Deserialize)]
struct VerboseWord {
    word: String,
    start: f64,
    end: f64,
}

impl OpenAiTranscriber {
    pub fn new(config: TranscribeConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn to_result(response: VerboseTranscription) -> TranscriptionResult {
        let words = response
            .words
            .into_iter()
            .enumerate()
            .map(|(i, w)| Word {
                num: i + 1,
                text: w.word.trim().to_string(),
                start: w.start,
                end: w.end,
            })
            .collect();
        TranscriptionResult {
            text: response.text,
            words,
        }
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(
        &self,
        audio: &Path,
        language: &str,
        _work_dir: &Path,
    ) -> Result<TranscriptionResult> {
        debug!("transcribing {} via API", audio.display());

        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());
        let bytes = tokio::fs::read(audio).await?;

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")
                    .map_err(|e| DubflowError::Transcribe(format!("invalid mime type: {}", e)))?,
            )
            .text("model", self.config.model.clone())
            .text("language", language.to_string())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DubflowError::Transcribe(format!(
                "transcription API returned {}: {}",
                status, body
            )));
        }

        let parsed: VerboseTranscription = response
            .json()
            .await
            .map_err(|e| DubflowError::Transcribe(format!("unreadable transcription response: {}", e)))?;

        Ok(Self::to_result(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_json_maps_to_numbered_words() {
        let payload = r#"{
            "text": "the quick brown fox",
            "words": [
                {"word": "the", "start": 0.0, "end": 0.1},
                {"word": "quick", "start": 0.1, "end": 0.2},
                {"word": "brown", "start": 0.2, "end": 0.3},
                {"word": "fox", "start": 0.3, "end": 0.4}
            ]
        }"#;
        let parsed: VerboseTranscription = serde_json::from_str(payload).unwrap();
        let result = OpenAiTranscriber::to_result(parsed);
        assert_eq!(result.text, "the quick brown fox");
        assert_eq!(result.words.len(), 4);
        assert_eq!(result.words[0].num, 1);
        assert_eq!(result.words[3].num, 4);
        assert!(result.words.windows(2).all(|w| w[0].num < w[1].num));
    }

    #[test]
    fn missing_words_field_yields_empty_list() {
        let payload = r#"{"text": ""}"#;
        let parsed: VerboseTranscription = serde_json::from_str(payload).unwrap();
        let result = OpenAiTranscriber::to_result(parsed);
        assert!(result.text.is_empty());
        assert!(result.words.is_empty());
    }
}
