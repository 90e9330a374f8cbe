// Speech synthesis ports and the dubbing stage.

pub mod clone;
pub mod dub;
pub mod openai;

use async_trait::async_trait;
use std::path::Path;

use crate::config::TtsConfig;
use crate::error::Result;

/// Port over text-to-speech backends. Output is 44.1 kHz PCM-16 mono WAV.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str, out_wav: &Path) -> Result<()>;
}

/// Port over voice-clone registration. Returns the voice code to use with
/// the TTS port.
#[async_trait]
pub trait VoiceCloner: Send + Sync {
    async fn clone_voice(&self, prefix: &str, audio_url: &str) -> Result<String>;
}

/// Factory selecting speech backends from configuration.
pub struct SpeechFactory;

impl SpeechFactory {
    pub fn create_tts(config: TtsConfig) -> Box<dyn TextToSpeech> {
        Box::new(openai::OpenAiSpeech::new(config))
    }

    pub fn create_cloner(config: TtsConfig) -> Box<dyn VoiceCloner> {
        Box::new(clone::HttpVoiceCloner::new(config))
    }
}
