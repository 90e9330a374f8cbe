//! Retime step: attach recovered timestamps to the LLM's sentences and
//! write the per-segment subtitle variants.
//!
//! Three files per segment: the bilingual SRT (primary), the
//! short-origin-mixed SRT (full translation blocks interleaved with short
//! original lines) and the short-origin SRT (short original lines only).
//! Sentences whose words cannot be aligned are skipped; the segment still
//! succeeds.

use std::fs;
use std::path::Path;
use tracing::warn;

use super::files;
use crate::error::Result;
use crate::lang::Language;
use crate::subtitle::align::align_sentence;
use crate::subtitle::split::{split_short_lines, ShortLine};
use crate::subtitle::timing::SrtTimestamp;
use crate::subtitle::{parse_no_ts_payload, SrtBlock};
use crate::transcribe::TranscriptionResult;
use crate::translate::NO_TEXT_SENTINEL;

pub(crate) fn retime_segment(
    base_dir: &Path,
    segment_num: usize,
    origin_language: &'static Language,
    translation_on_top: bool,
    max_word_one_line: usize,
    offset_secs: f64,
    transcription: &TranscriptionResult,
) -> Result<()> {
    let no_ts_path = base_dir.join(files::split_no_ts_srt(segment_num));
    let payload = fs::read_to_string(&no_ts_path)?;
    if payload.contains(NO_TEXT_SENTINEL) {
        return Ok(());
    }

    let blocks = parse_no_ts_payload(&payload);
    if blocks.is_empty() {
        return Ok(());
    }

    let mut last_ts = 0.0_f64;
    let mut missed = 0usize;
    let mut timed: Vec<(SrtBlock, Vec<ShortLine>)> = Vec::new();

    for block in &blocks {
        if block.origin.is_empty() {
            continue;
        }
        let Some(aligned) =
            align_sentence(&transcription.words, &block.origin, last_ts, origin_language)
        else {
            missed += 1;
            continue;
        };
        if aligned.end < aligned.start {
            missed += 1;
            continue;
        }

        let short_lines = split_short_lines(
            &block.origin,
            &aligned.words,
            aligned.start,
            aligned.end,
            last_ts,
            max_word_one_line,
        );

        timed.push((
            SrtBlock {
                index: block.index,
                start: SrtTimestamp::from_seconds(aligned.start + offset_secs),
                end: SrtTimestamp::from_seconds(aligned.end + offset_secs),
                origin: block.origin.clone(),
                target: block.translation.clone(),
            },
            short_lines,
        ));
        last_ts = aligned.last_ts;
    }

    if missed > 0 {
        warn!(segment = segment_num, missed_sentences = missed, "sentences skipped during retiming");
    }

    write_segment_files(
        base_dir,
        segment_num,
        translation_on_top,
        offset_secs,
        &timed,
    )
}

fn write_segment_files(
    base_dir: &Path,
    segment_num: usize,
    translation_on_top: bool,
    offset_secs: f64,
    timed: &[(SrtBlock, Vec<ShortLine>)],
) -> Result<()> {
    let mut bilingual = String::new();
    let mut mixed = String::new();
    let mut short = String::new();
    let mut mixed_num = 1usize;
    let mut short_num = 1usize;

    for (block, short_lines) in timed {
        bilingual.push_str(&block.render_bilingual(translation_on_top));

        // Full translation first, then the short original lines.
        mixed.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            mixed_num, block.start, block.end, block.target
        ));
        mixed_num += 1;

        for line in short_lines {
            let start = SrtTimestamp::from_seconds(line.start + offset_secs);
            let end = SrtTimestamp::from_seconds(line.end + offset_secs);
            mixed.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                mixed_num, start, end, line.text
            ));
            mixed_num += 1;
            short.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                short_num, start, end, line.text
            ));
            short_num += 1;
        }
    }

    fs::write(base_dir.join(files::split_bilingual_srt(segment_num)), bilingual)?;
    fs::write(
        base_dir.join(files::split_short_origin_mixed_srt(segment_num)),
        mixed,
    )?;
    fs::write(base_dir.join(files::split_short_origin_srt(segment_num)), short)?;
    Ok(())
}
