//! Dubbing stage: synthesize speech per subtitle block and re-time the
//! result against the original timeline.
//!
//! Every block's audio is stretched or padded to exactly fill its slot (the
//! gap to the next block's start), so concatenating the adjusted pieces
//! reproduces the source timing. A leading silence covers the span before
//! the first block.

use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{TextToSpeech, VoiceCloner};
use crate::error::{DubflowError, Result};
use crate::media::MediaGateway;
use crate::pipeline::files;
use crate::store::ObjectStore;
use crate::subtitle::timing::SrtTimestamp;
use crate::task::generate_task_id;

/// Audio durations within this distance of the slot are used as-is.
const DURATION_EPSILON: f64 = 0.001;

/// One subtitle block as consumed by speech synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechBlock {
    pub start: SrtTimestamp,
    pub end: SrtTimestamp,
    pub text: String,
}

/// Parse an SRT file into speech blocks; only the first content line of
/// each block is spoken.
pub fn parse_speech_blocks(content: &str) -> Vec<SpeechBlock> {
    let re = Regex::new(r"(\d{2}:\d{2}:\d{2},\d{3}) --> (\d{2}:\d{2}:\d{2},\d{3})[ \t]*\n(.+)")
        .expect("speech block regex");

    re.captures_iter(content)
        .filter_map(|caps| {
            let start: SrtTimestamp = caps[1].parse().ok()?;
            let end: SrtTimestamp = caps[2].parse().ok()?;
            let text = caps[3].trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(SpeechBlock { start, end, text })
        })
        .collect()
}

/// The time slot a block's audio must fill, in seconds: up to the next
/// block's start, or its own span for the last block (and whenever blocks
/// touch or overlap).
pub fn slot_duration(blocks: &[SpeechBlock], i: usize) -> f64 {
    let block = &blocks[i];
    let mut slot = block.end.saturating_sub(block.start);
    if let Some(next) = blocks.get(i + 1) {
        if next.start > block.end {
            slot = next.start.saturating_sub(block.start);
        }
    }
    slot.as_seconds()
}

/// Synthesize and re-time a dubbed audio track for the given SRT file.
/// Returns the path of the concatenated result.
#[allow(clippy::too_many_arguments)]
pub async fn synthesize_dub(
    media: &MediaGateway,
    tts: &dyn TextToSpeech,
    cloner: &dyn VoiceCloner,
    store: &dyn ObjectStore,
    store_bucket: &str,
    base_dir: &Path,
    srt_path: &Path,
    voice: &str,
    clone_source: Option<&Path>,
) -> Result<PathBuf> {
    let content = tokio::fs::read_to_string(srt_path).await?;
    let blocks = parse_speech_blocks(&content);
    if blocks.is_empty() {
        return Err(DubflowError::Format(format!(
            "no speakable subtitle blocks in {}",
            srt_path.display()
        )));
    }

    // Voice selection: a clone source takes precedence over the configured
    // voice code.
    let voice = match clone_source {
        Some(source) => {
            let ext = source
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            let key = format!("{}{}", generate_task_id(5), ext);
            store.upload(&key, source, store_bucket).await?;
            cloner.clone_voice("dubflow", &store.object_url(&key)).await?
        }
        None => voice.to_string(),
    };

    let mut details = String::new();
    let mut audio_files: Vec<String> = Vec::new();
    let mut clock_ms = 0u64;

    // A first block that starts late gets a leading silence so the dubbed
    // track stays aligned with the video.
    let first_start = blocks[0].start;
    if first_start > SrtTimestamp::ZERO {
        let silence_name = "silence_0.wav".to_string();
        media
            .generate_silence(&base_dir.join(&silence_name), first_start.as_seconds())
            .await?;
        let end_ms = clock_ms + first_start.as_millis();
        details.push_str(&format!(
            "Silence: start={}, end={}\n",
            SrtTimestamp::from_millis(clock_ms),
            SrtTimestamp::from_millis(end_ms)
        ));
        clock_ms = end_ms;
        audio_files.push(silence_name);
    }

    for (i, block) in blocks.iter().enumerate() {
        let raw_name = files::tts_block_wav(i + 1);
        tts.synthesize(&block.text, &voice, &base_dir.join(&raw_name)).await?;

        let slot = slot_duration(&blocks, i);
        let adjusted_name = files::tts_adjusted_wav(i + 1);
        adjust_audio_duration(
            media,
            base_dir,
            &base_dir.join(&raw_name),
            &base_dir.join(&adjusted_name),
            slot,
        )
        .await?;

        let actual = media.media_duration(&base_dir.join(&adjusted_name)).await?;
        let end_ms = clock_ms + SrtTimestamp::from_seconds(actual).as_millis();
        details.push_str(&format!(
            "Audio {}: start={}, end={}\n",
            i + 1,
            SrtTimestamp::from_millis(clock_ms),
            SrtTimestamp::from_millis(end_ms)
        ));
        clock_ms = end_ms;
        audio_files.push(adjusted_name);
    }

    tokio::fs::write(base_dir.join(files::TTS_DURATION_DETAILS), details).await?;

    // Concat manifest entries are relative to the manifest directory.
    let list_path = base_dir.join(files::TTS_CONCAT_LIST);
    let manifest: String = audio_files
        .iter()
        .map(|name| format!("file '{}'\n", name))
        .collect();
    tokio::fs::write(&list_path, manifest).await?;

    let result = base_dir.join(files::TTS_RESULT);
    media.concat(&list_path, &result).await?;

    info!("dubbed audio written to {}", result.display());
    Ok(result)
}

/// Fit one synthesized block into its slot: pad with silence when short,
/// time-stretch when long, copy when it already fits.
async fn adjust_audio_duration(
    media: &MediaGateway,
    base_dir: &Path,
    input: &Path,
    output: &Path,
    slot_secs: f64,
) -> Result<()> {
    let actual = media.media_duration(input).await?;

    if slot_secs <= DURATION_EPSILON {
        tokio::fs::copy(input, output).await?;
        return Ok(());
    }

    if actual + DURATION_EPSILON < slot_secs {
        let silence_name = "silence.wav";
        media
            .generate_silence(&base_dir.join(silence_name), slot_secs - actual)
            .await?;

        let input_name = input
            .file_name()
            .ok_or_else(|| DubflowError::Internal("adjust input has no file name".to_string()))?
            .to_string_lossy();
        let list_path = base_dir.join("concat.txt");
        tokio::fs::write(
            &list_path,
            format!("file '{}'\nfile '{}'\n", input_name, silence_name),
        )
        .await?;

        let result = media.concat(&list_path, output).await;
        let _ = tokio::fs::remove_file(&list_path).await;
        return result;
    }

    if actual > slot_secs + DURATION_EPSILON {
        return media.change_tempo(input, output, actual / slot_secs).await;
    }

    tokio::fs::copy(input, output).await?;
    Ok(())
}
