use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use super::{TranscriptionResult, Transcriber, Word};
use crate::config::TranscribeConfig;
use crate::error::{DubflowError, Result};

/// Local whisper CLI invocation with word-level timestamps enabled.
/// The CLI writes `<stem>.json` into the working directory.
pub struct WhisperCliTranscriber {
    config: TranscribeConfig,
}

#[derive(Debug, Deserialize)]
struct WhisperJsonOutput {
    text: String,
    #[serde(default)]
    segments: Vec<WhisperJsonSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperJsonSegment {
    #[serde(default)]
    words: Vec<WhisperJsonWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperJsonWord {
    word: String,
    start: f64,
    end: f64,
}

impl WhisperCliTranscriber {
    pub fn new(config: TranscribeConfig) -> Self {
        Self { config }
    }

    fn to_result(output: WhisperJsonOutput) -> TranscriptionResult {
        let words = output
            .segments
            .into_iter()
            .flat_map(|seg| seg.words)
            .enumerate()
            .map(|(i, w)| Word {
                num: i + 1,
                text: w.word.trim().to_string(),
                start: w.start,
                end: w.end,
            })
            .collect();
        TranscriptionResult {
            text: output.text.trim().to_string(),
            words,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    async fn transcribe(
        &self,
        audio: &Path,
        language: &str,
        work_dir: &Path,
    ) -> Result<TranscriptionResult> {
        debug!("transcribing {} via {}", audio.display(), self.config.binary_path);

        let output = Command::new(&self.config.binary_path)
            .arg(audio)
            .arg("--model")
            .arg(&self.config.model)
            .arg("--language")
            .arg(language)
            .arg("--output_dir")
            .arg(work_dir)
            .arg("--output_format")
            .arg("json")
            .arg("--word_timestamps")
            .arg("True")
            .output()
            .await
            .map_err(|e| DubflowError::Transcribe(format!("failed to start whisper: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubflowError::Transcribe(format!("whisper failed: {}", stderr)));
        }

        let stem = audio
            .file_stem()
            .ok_or_else(|| DubflowError::Transcribe("invalid audio filename".to_string()))?;
        let json_file = work_dir.join(format!("{}.json", stem.to_string_lossy()));
        let content = tokio::fs::read_to_string(&json_file).await.map_err(|e| {
            DubflowError::Transcribe(format!("failed to read {}: {}", json_file.display(), e))
        })?;

        let parsed: WhisperJsonOutput = serde_json::from_str(&content)
            .map_err(|e| DubflowError::Transcribe(format!("failed to parse whisper JSON: {}", e)))?;

        Ok(Self::to_result(parsed))
    }

    fn is_local(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_flatten_into_global_word_numbers() {
        let payload = r#"{
            "text": " hello world again ",
            "segments": [
                {"words": [
                    {"word": " hello", "start": 0.0, "end": 0.4},
                    {"word": " world", "start": 0.4, "end": 0.9}
                ]},
                {"words": [
                    {"word": " again", "start": 1.0, "end": 1.5}
                ]}
            ]
        }"#;
        let parsed: WhisperJsonOutput = serde_json::from_str(payload).unwrap();
        let result = WhisperCliTranscriber::to_result(parsed);
        assert_eq!(result.text, "hello world again");
        assert_eq!(result.words.len(), 3);
        assert_eq!(result.words[2].num, 3);
        assert_eq!(result.words[0].text, "hello");
    }

    #[test]
    fn empty_output_is_permitted() {
        let parsed: WhisperJsonOutput = serde_json::from_str(r#"{"text": ""}"#).unwrap();
        let result = WhisperCliTranscriber::to_result(parsed);
        assert!(result.text.is_empty());
        assert!(result.words.is_empty());
    }
}
