// LLM port and the joint segmentation + translation step.
//
// The model receives the raw transcript and must return repeated
// three-line blocks: sequence number, translation, bracketed original.
// Responses are validated before acceptance; the original lines must
// cover the input text within a fixed tolerance.

pub mod openai;

use async_trait::async_trait;
use tracing::warn;

use crate::config::LlmConfig;
use crate::error::{DubflowError, Result};
use crate::lang::Language;

/// Port over chat-completion backends.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Factory selecting a chat completer from configuration.
pub struct ChatCompleterFactory;

impl ChatCompleterFactory {
    pub fn create(config: LlmConfig) -> Box<dyn ChatCompleter> {
        Box::new(openai::OpenAiChatCompleter::new(config))
    }
}

/// Sentinel the model emits when the transcript carries no speech.
pub const NO_TEXT_SENTINEL: &str = "[no-text]";

const SPLIT_ATTEMPTS: usize = 4;

/// Build the segmentation + translation prompt. The transcript is appended
/// directly after the returned string.
pub fn build_split_prompt(target: &Language, modal_filter: bool) -> String {
    let filter_rule = if modal_filter {
        "\n- Remove filler and modal words (um, uh, hmm, 嗯, 啊, 呃) from the original sentences."
    } else {
        ""
    };

    format!(
        "You are a professional subtitle translator. Split the transcript below into natural \
         spoken sentences and translate every sentence into {target}.\n\
         For each sentence output exactly three lines:\n\
         1. the sentence number, starting from 1\n\
         2. the {target} translation\n\
         3. the original sentence wrapped in square brackets\n\
         Rules:\n\
         - Keep the original wording intact; never merge, reorder or drop content.\n\
         - Do not add explanations or anything outside the numbered blocks.\n\
         - If the transcript is empty or contains no speech, output {sentinel} only.{filter_rule}\n\n\
         Transcript:\n",
        target = target.english_name,
        sentinel = NO_TEXT_SENTINEL,
        filter_rule = filter_rule,
    )
}

/// Ask the model to segment and translate, retrying until the payload
/// passes validation.
pub async fn split_and_translate(
    completer: &dyn ChatCompleter,
    target: &Language,
    modal_filter: bool,
    text: &str,
) -> Result<String> {
    let prompt = build_split_prompt(target, modal_filter);

    let mut last_err = DubflowError::Format("no translation attempt made".to_string());
    for attempt in 1..=SPLIT_ATTEMPTS {
        match completer.complete(&format!("{}{}", prompt, text)).await {
            Ok(payload) => {
                if is_valid_split_payload(&payload, text) {
                    return Ok(payload);
                }
                warn!(attempt, "split payload failed validation, retrying");
                last_err = DubflowError::Format(
                    "LLM split output failed validation after all attempts".to_string(),
                );
            }
            Err(e) => {
                warn!(attempt, error = %e, "chat completion failed, retrying");
                last_err = e;
            }
        }
    }
    Err(last_err)
}

/// Validate a split+translate payload against the source transcript.
///
/// Accepted when the payload parses into at least one well-formed
/// three-line block and the concatenated originals stay within 200
/// characters of the input, or when both sides agree there is no text.
pub fn is_valid_split_payload(payload: &str, original_text: &str) -> bool {
    let payload = payload.trim();
    let original_trimmed = original_text.trim();

    if payload.is_empty() || original_trimmed.is_empty() {
        return payload.is_empty() && original_trimmed.is_empty();
    }

    if payload.contains(NO_TEXT_SENTINEL) {
        return original_trimmed.chars().count() < 10;
    }

    let lines: Vec<&str> = payload.lines().collect();
    if lines.len() < 3 {
        return false;
    }

    let mut original_lines: Vec<String> = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() {
            i += 1;
            continue;
        }
        match line.parse::<i64>() {
            Ok(n) if n > 0 => {
                if i + 2 >= lines.len() {
                    return false;
                }
                let translation = lines[i + 1].trim();
                let original = lines[i + 2].trim();
                if translation.is_empty() || original.is_empty() {
                    return false;
                }
                let original = original.strip_prefix('[').unwrap_or(original);
                let original = original.strip_suffix(']').unwrap_or(original);
                original_lines.push(original.to_string());
                i += 3;
            }
            _ => {
                i += 1;
            }
        }
    }

    if original_lines.is_empty() {
        return false;
    }

    let combined: String = original_lines.concat();
    let original_len = original_trimmed.chars().count() as i64;
    let combined_len = combined.trim().chars().count() as i64;

    (original_len - combined_len).abs() <= 200
}
