//! Task-directory layout. All intermediate and output files of a task live
//! under `<task_dir>/<task_id>/`, with user-facing artifacts in `output/`.

pub const AUDIO_FILE: &str = "audio.mp3";
pub const VIDEO_FILE: &str = "video.mp4";

/// ffmpeg segment output pattern; ordinals are assigned from the sorted
/// glob result, 1-based.
pub const SPLIT_AUDIO_PATTERN: &str = "split_audio_%03d.mp3";
pub const SPLIT_AUDIO_PREFIX: &str = "split_audio_";

pub const BILINGUAL_SRT: &str = "bilingual.srt";
pub const ORIGIN_NO_TS_SRT: &str = "origin_no_ts.srt";
pub const SHORT_ORIGIN_SRT: &str = "short_origin.srt";
pub const SHORT_ORIGIN_MIXED_SRT: &str = "short_origin_mixed.srt";

pub const ORIGIN_SRT: &str = "origin_language.srt";
pub const TARGET_SRT: &str = "target_language.srt";
pub const ORIGIN_TEXT: &str = "output/origin_language.txt";
pub const TARGET_TEXT: &str = "output/target_language.txt";

pub const ASS_FILE: &str = "formatted_subtitles.ass";
pub const HORIZONTAL_EMBED: &str = "output/horizontal_embed.mp4";
pub const VERTICAL_EMBED: &str = "output/vertical_embed.mp4";
pub const CONVERTED_VERTICAL_VIDEO: &str = "converted_vertical.mp4";

pub const TTS_DURATION_DETAILS: &str = "tts_audio_duration_details.txt";
pub const TTS_RESULT: &str = "tts_result.wav";
pub const TTS_CONCAT_LIST: &str = "audio_list.txt";

pub fn split_no_ts_srt(num: usize) -> String {
    format!("split_{}_no_ts.srt", num)
}

pub fn split_bilingual_srt(num: usize) -> String {
    format!("split_{}_bilingual.srt", num)
}

pub fn split_short_origin_srt(num: usize) -> String {
    format!("split_{}_short_origin.srt", num)
}

pub fn split_short_origin_mixed_srt(num: usize) -> String {
    format!("split_{}_short_origin_mixed.srt", num)
}

pub fn tts_block_wav(num: usize) -> String {
    format!("subtitle_{}.wav", num)
}

pub fn tts_adjusted_wav(num: usize) -> String {
    format!("adjusted_{}.wav", num)
}

/// Insert a suffix before the file extension: `a/b.srt` -> `a/b_replaced.srt`.
pub fn add_suffix_to_file_name(path: &std::path::Path, suffix: &str) -> std::path::PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let ext = path.extension().map(|s| s.to_string_lossy());
    let file_name = match ext {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext),
        None => format!("{}{}", stem, suffix),
    };
    path.with_file_name(file_name)
}
