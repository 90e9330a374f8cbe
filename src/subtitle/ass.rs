//! SRT to ASS conversion for subtitle burn-in.
//!
//! Two fixed layouts: horizontal (dual-line bilingual, bottom-anchored) and
//! vertical (stacked portrait frame). Dialogue styling is carried by the
//! `Major`/`Minor` styles declared in the headers.

use crate::lang::{self, Language};

use super::{parse_srt, timing::SrtTimestamp};

pub const ASS_HEADER_HORIZONTAL: &str = "[Script Info]\n\
ScriptType: v4.00+\n\
PlayResX: 1920\n\
PlayResY: 1080\n\
WrapStyle: 2\n\
ScaledBorderAndShadow: yes\n\
\n\
[V4+ Styles]\n\
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
Style: Major,Arial,72,&H00FFFFFF,&H000000FF,&H00000000,&H80000000,-1,0,0,0,100,100,0,0,1,3,1,2,10,10,45,1\n\
Style: Minor,Arial,48,&H0000FFFF,&H000000FF,&H00000000,&H80000000,0,0,0,0,100,100,0,0,1,3,1,2,10,10,45,1\n\
\n\
[Events]\n\
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n";

pub const ASS_HEADER_VERTICAL: &str = "[Script Info]\n\
ScriptType: v4.00+\n\
PlayResX: 720\n\
PlayResY: 1280\n\
WrapStyle: 2\n\
ScaledBorderAndShadow: yes\n\
\n\
[V4+ Styles]\n\
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
Style: Major,Arial,60,&H00FFFFFF,&H000000FF,&H00000000,&H80000000,-1,0,0,0,100,100,0,0,1,3,1,2,10,10,330,1\n\
Style: Minor,Arial,44,&H00FFFFFF,&H000000FF,&H00000000,&H80000000,0,0,0,0,100,100,0,0,1,3,1,2,10,10,330,1\n\
\n\
[Events]\n\
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n";

const VERTICAL_CHARS_PER_LINE: usize = 10;

/// Layout parameters for the conversion.
pub struct AssLayout<'a> {
    pub horizontal: bool,
    /// Language of the block's top (major) line.
    pub major_language: &'a Language,
    pub max_word_one_line: usize,
}

/// Convert bilingual SRT content to an ASS script.
pub fn srt_to_ass(srt: &str, layout: &AssLayout) -> String {
    let blocks = parse_srt(srt);
    let mut out = String::from(if layout.horizontal {
        ASS_HEADER_HORIZONTAL
    } else {
        ASS_HEADER_VERTICAL
    });

    for block in &blocks {
        if layout.horizontal {
            if block.lines.len() < 2 {
                continue;
            }
            let major = split_major_text(
                &block.lines[0],
                layout.major_language,
                layout.max_word_one_line,
            )
            .join("      \\N");
            let minor = lang::clean_punctuation(&block.lines[1]);
            out.push_str(&dialogue(
                block.start,
                block.end,
                "Major",
                &format!("{{\\an2}}{{\\rMajor}}{}\\N{{\\rMinor}}{}", major, minor),
            ));
        } else {
            let Some(content) = block.lines.first() else {
                continue;
            };
            if content.is_empty() {
                continue;
            }

            if !lang::contains_alphabetic(content) {
                let chunks = split_char_chunks(content, VERTICAL_CHARS_PER_LINE);
                let total_ms = block.end.saturating_sub(block.start).as_millis();
                let n = chunks.len() as u64;
                for (i, chunk) in chunks.iter().enumerate() {
                    let i = i as u64;
                    let chunk_start =
                        SrtTimestamp::from_millis(block.start.as_millis() + total_ms * i / n);
                    let chunk_end = SrtTimestamp::from_millis(
                        (block.start.as_millis() + total_ms * (i + 1) / n)
                            .min(block.end.as_millis()),
                    );
                    out.push_str(&dialogue(
                        chunk_start,
                        chunk_end,
                        "Major",
                        &format!("{{\\an2}}{{\\rMajor}}{}", lang::clean_punctuation(chunk)),
                    ));
                }
            } else {
                out.push_str(&dialogue(
                    block.start,
                    block.end,
                    "Minor",
                    &format!("{{\\an2}}{{\\rMinor}}{}", lang::clean_punctuation(content)),
                ));
            }
        }
    }

    out
}

fn dialogue(start: SrtTimestamp, end: SrtTimestamp, style: &str, text: &str) -> String {
    format!(
        "Dialogue: 0,{},{},{},,0,0,0,,{}\n",
        start.ass(),
        end.ass(),
        style,
        text
    )
}

/// Break the major line into two visually balanced sub-lines at the 2/5
/// mark, but only when it exceeds the per-line width. Character-based
/// scripts count characters, others count words.
pub fn split_major_text(text: &str, language: &Language, max_word_one_line: usize) -> Vec<String> {
    let (segments, separator): (Vec<String>, &str) = if language.char_split {
        (text.chars().map(|c| c.to_string()).collect(), "")
    } else {
        (text.split(' ').map(|s| s.to_string()).collect(), " ")
    };

    let total = segments.len();
    if total <= max_word_one_line {
        return vec![text.to_string()];
    }

    let split_index = (total * 2 / 5).max(1).min(total - 1);
    let line1 = lang::clean_punctuation(&segments[..split_index].join(separator)).to_string();
    let line2 = lang::clean_punctuation(&segments[split_index..].join(separator)).to_string();
    vec![line1, line2]
}

/// Chunk a character-based line into groups of at most `max` characters.
pub fn split_char_chunks(text: &str, max: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Language;

    fn english() -> &'static Language {
        Language::from_tag("en").unwrap()
    }

    fn chinese() -> &'static Language {
        Language::from_tag("zh_cn").unwrap()
    }

    const BILINGUAL_SRT: &str = "1\n00:00:01,000 --> 00:00:02,500\nhello world\n你好世界\n\n\
                                 2\n00:00:02,500 --> 00:00:04,000\nsecond line here\n第二行\n\n";

    #[test]
    fn horizontal_conversion_preserves_timestamps() {
        let layout = AssLayout {
            horizontal: true,
            major_language: english(),
            max_word_one_line: 12,
        };
        let ass = srt_to_ass(BILINGUAL_SRT, &layout);
        assert!(ass.starts_with("[Script Info]"));
        assert!(ass.contains("Dialogue: 0,0:00:01.00,0:00:02.50,Major"));
        assert!(ass.contains("Dialogue: 0,0:00:02.50,0:00:04.00,Major"));
        assert!(ass.contains("{\\rMajor}hello world\\N{\\rMinor}你好世界"));
    }

    #[test]
    fn horizontal_skips_single_line_blocks() {
        let srt = "1\n00:00:00,000 --> 00:00:01,000\nonly one line\n\n";
        let layout = AssLayout {
            horizontal: true,
            major_language: english(),
            max_word_one_line: 12,
        };
        let ass = srt_to_ass(srt, &layout);
        assert!(!ass.contains("Dialogue:"));
    }

    #[test]
    fn long_major_line_splits_at_two_fifths() {
        let text = "one two three four five six seven eight nine ten";
        let lines = split_major_text(text, english(), 6);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "one two three four");
        assert_eq!(lines[1], "five six seven eight nine ten");
    }

    #[test]
    fn short_major_line_stays_whole() {
        let lines = split_major_text("short line", english(), 12);
        assert_eq!(lines, vec!["short line"]);
    }

    #[test]
    fn chinese_major_line_splits_by_characters() {
        let text = "今天天气很好我们出去玩吧";
        let lines = split_major_text(text, chinese(), 6);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].chars().count(), 4);
        assert_eq!(lines[1].chars().count(), 8);
    }

    #[test]
    fn vertical_cjk_line_is_chunked_with_prorated_times() {
        let srt = "1\n00:00:00,000 --> 00:00:04,000\n这是一个非常长的中文字幕需要分行显示\n\n";
        let layout = AssLayout {
            horizontal: false,
            major_language: chinese(),
            max_word_one_line: 12,
        };
        let ass = srt_to_ass(srt, &layout);
        // 18 characters -> two chunks of 10 and 8, each taking half the slot.
        assert!(ass.contains("Dialogue: 0,0:00:00.00,0:00:02.00,Major"));
        assert!(ass.contains("Dialogue: 0,0:00:02.00,0:00:04.00,Major"));
    }

    #[test]
    fn vertical_alphabetic_line_is_single_dialogue() {
        let srt = "1\n00:00:00,000 --> 00:00:02,000\nplain english line\n\n";
        let layout = AssLayout {
            horizontal: false,
            major_language: english(),
            max_word_one_line: 12,
        };
        let ass = srt_to_ass(srt, &layout);
        assert!(ass.contains("{\\rMinor}plain english line"));
        assert_eq!(ass.matches("Dialogue:").count(), 1);
    }

    #[test]
    fn char_chunks_cap_at_max() {
        let chunks = split_char_chunks("一二三四五六七八九十十一", 10);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 10);
        assert_eq!(chunks[1].chars().count(), 2);
    }

    #[test]
    fn ass_round_trip_preserves_block_timing() {
        let layout = AssLayout {
            horizontal: true,
            major_language: english(),
            max_word_one_line: 12,
        };
        let ass = srt_to_ass(BILINGUAL_SRT, &layout);

        // Recover the dialogue timings and compare against the source SRT.
        let source = parse_srt(BILINGUAL_SRT);
        let times: Vec<(&str, &str)> = ass
            .lines()
            .filter(|l| l.starts_with("Dialogue:"))
            .map(|l| {
                let mut fields = l.splitn(4, ',');
                fields.next();
                (fields.next().unwrap(), fields.next().unwrap())
            })
            .collect();
        assert_eq!(times.len(), source.len());
        for (block, (start, end)) in source.iter().zip(times) {
            assert_eq!(block.start.ass(), start);
            assert_eq!(block.end.ass(), end);
        }
    }
}
