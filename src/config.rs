use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DubflowError, Result};

fn default_segment_duration_min() -> u64 {
    5
}

fn default_translate_parallel_num() -> usize {
    5
}

fn default_max_word_one_line() -> usize {
    12
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub media: MediaConfig,
    pub transcribe: TranscribeConfig,
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory that receives one subdirectory per task
    pub task_dir: String,
    /// Audio slice length in minutes
    #[serde(default = "default_segment_duration_min")]
    pub segment_duration_min: u64,
    /// Upper bound on concurrent fan-out workers per task
    #[serde(default = "default_translate_parallel_num")]
    pub translate_parallel_num: usize,
    /// Default maximum words (or characters) per subtitle line
    #[serde(default = "default_max_word_one_line")]
    pub max_word_one_line: usize,
    /// Proxy URL forwarded to the URL grabber, empty to disable
    #[serde(default)]
    pub proxy: String,
    /// Cookies file forwarded to the URL grabber, empty to disable
    #[serde(default)]
    pub cookies_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to the ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to the ffprobe binary
    pub ffprobe_path: String,
    /// Path to the yt-dlp binary
    pub ytdlp_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscribeProvider {
    /// OpenAI-compatible transcription API with word timestamps
    Openai,
    /// Local whisper CLI writing word-level JSON
    WhisperCli,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeConfig {
    pub provider: TranscribeProvider,
    /// API base URL for the `openai` provider
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    /// Binary path for the `whisper-cli` provider
    #[serde(default)]
    pub binary_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions base URL
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// OpenAI-compatible speech synthesis base URL
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Default voice code when no clone source is supplied
    pub voice: String,
    /// HTTP endpoint registering a cloned voice, empty to disable cloning
    #[serde(default)]
    pub clone_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Object store endpoint (S3-style path addressing), empty to disable
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                task_dir: "./tasks".to_string(),
                segment_duration_min: default_segment_duration_min(),
                translate_parallel_num: default_translate_parallel_num(),
                max_word_one_line: default_max_word_one_line(),
                proxy: String::new(),
                cookies_file: String::new(),
            },
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                ytdlp_path: "yt-dlp".to_string(),
            },
            transcribe: TranscribeConfig {
                provider: TranscribeProvider::Openai,
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "whisper-1".to_string(),
                binary_path: "whisper".to_string(),
            },
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "gpt-4o-mini".to_string(),
            },
            tts: TtsConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "tts-1".to_string(),
                voice: "alloy".to_string(),
                clone_endpoint: String::new(),
            },
            store: StoreConfig {
                endpoint: String::new(),
                bucket: String::new(),
                access_key: String::new(),
                secret_key: String::new(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DubflowError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| DubflowError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DubflowError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| DubflowError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Audio slice length in seconds.
    pub fn segment_duration_secs(&self) -> u64 {
        self.app.segment_duration_min * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.app.segment_duration_min, 5);
        assert_eq!(parsed.app.translate_parallel_num, 5);
        assert_eq!(parsed.app.max_word_one_line, 12);
        assert_eq!(parsed.transcribe.provider, TranscribeProvider::Openai);
    }

    #[test]
    fn segment_duration_converts_to_seconds() {
        let mut config = Config::default();
        config.app.segment_duration_min = 5;
        assert_eq!(config.segment_duration_secs(), 300);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let toml_str = r#"
            [app]
            task_dir = "/tmp/tasks"

            [media]
            ffmpeg_path = "ffmpeg"
            ffprobe_path = "ffprobe"
            ytdlp_path = "yt-dlp"

            [transcribe]
            provider = "whisper-cli"
            binary_path = "whisper"

            [llm]
            base_url = "http://localhost:8000/v1"
            api_key = "k"
            model = "m"

            [tts]
            base_url = "http://localhost:8000/v1"
            api_key = "k"
            model = "m"
            voice = "v"

            [store]
        "#;
        let parsed: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.app.segment_duration_min, 5);
        assert_eq!(parsed.transcribe.provider, TranscribeProvider::WhisperCli);
        assert!(parsed.store.endpoint.is_empty());
    }
}
