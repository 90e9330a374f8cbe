// Transcription port and provider implementations.
//
// Providers are selected by configuration through a factory. Each returns
// the full text plus word-level timings; word numbers are monotonically
// increasing within one call (gaps allowed for tokens the recognizer did
// not emit as words).

pub mod openai;
pub mod whisper_cli;

use async_trait::async_trait;
use std::path::Path;

use crate::config::{TranscribeConfig, TranscribeProvider};
use crate::error::Result;

/// One recognized word with segment-local timings in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    /// Monotonically increasing sequence number, starting at 1.
    /// Zero is reserved for placeholder words that carry no timing.
    pub num: usize,
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl Word {
    pub fn placeholder(text: &str) -> Self {
        Self {
            num: 0,
            text: text.to_string(),
            start: 0.0,
            end: 0.0,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.num == 0
    }
}

/// Full-text transcription with ordered word timings.
#[derive(Debug, Clone, Default)]
pub struct TranscriptionResult {
    pub text: String,
    pub words: Vec<Word>,
}

/// Port over speech recognition backends.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one audio file. `language` is the recognizer's language
    /// code; `work_dir` may be used for intermediate output files.
    async fn transcribe(
        &self,
        audio: &Path,
        language: &str,
        work_dir: &Path,
    ) -> Result<TranscriptionResult>;

    /// Local providers force the fan-out stage down to one worker.
    fn is_local(&self) -> bool {
        false
    }
}

/// Factory selecting a transcriber from configuration.
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create(config: TranscribeConfig) -> Box<dyn Transcriber> {
        match config.provider {
            TranscribeProvider::Openai => Box::new(openai::OpenAiTranscriber::new(config)),
            TranscribeProvider::WhisperCli => Box::new(whisper_cli::WhisperCliTranscriber::new(config)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_words_have_no_number() {
        let word = Word::placeholder("hello");
        assert!(word.is_placeholder());
        assert_eq!(word.start, 0.0);
    }

    #[test]
    fn factory_respects_provider_locality() {
        let mut config = crate::config::Config::default().transcribe;
        config.provider = TranscribeProvider::WhisperCli;
        assert!(TranscriberFactory::create(config.clone()).is_local());
        config.provider = TranscribeProvider::Openai;
        assert!(!TranscriberFactory::create(config).is_local());
    }
}
