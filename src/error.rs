use thiserror::Error;

#[derive(Error, Debug)]
pub enum DubflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("subprocess failed: {0}")]
    Process(String),

    #[error("transcription error: {0}")]
    Transcribe(String),

    #[error("translation error: {0}")]
    Translate(String),

    #[error("speech synthesis error: {0}")]
    Speech(String),

    #[error("object store error: {0}")]
    Store(String),

    #[error("format error: {0}")]
    Format(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("task cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, DubflowError>;
