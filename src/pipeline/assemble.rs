//! Assemble stage: split the merged bilingual SRT into single-language
//! subtitle and plain-text files, and register the output descriptors.

use std::fs;
use tracing::info;

use super::{files, Pipeline, PipelineContext, SubtitleLayout, UiLanguage};
use crate::error::{DubflowError, Result};
use crate::lang::Language;
use crate::subtitle::{parse_srt, ParsedBlock};
use crate::task::SubtitleFile;

impl Pipeline {
    pub(crate) fn stage_assemble(&self, ctx: &mut PipelineContext) -> Result<()> {
        let bilingual_path = ctx.bilingual_srt.clone().ok_or_else(|| {
            DubflowError::Internal("assemble ran before the bilingual subtitle".to_string())
        })?;
        info!(task_id = %ctx.task_id, "assembling subtitle variants");

        let content = fs::read_to_string(&bilingual_path)?;
        let split = split_bilingual(&content, ctx.layout.translation_on_top());

        let origin_srt = ctx.base_dir.join(files::ORIGIN_SRT);
        let target_srt = ctx.base_dir.join(files::TARGET_SRT);
        fs::write(&origin_srt, &split.origin_srt)?;
        fs::write(ctx.base_dir.join(files::ORIGIN_TEXT), &split.origin_text)?;
        fs::write(&target_srt, &split.target_srt)?;
        fs::write(ctx.base_dir.join(files::TARGET_TEXT), &split.target_text)?;

        ctx.subtitles.push(SubtitleFile {
            path: origin_srt.clone(),
            language: ctx.origin_language.tag.to_string(),
            name: monolingual_name(ctx.origin_language, ctx.ui_language),
            download_url: None,
        });

        if ctx.layout != SubtitleLayout::OriginOnly {
            ctx.subtitles.push(SubtitleFile {
                path: target_srt.clone(),
                language: ctx.target_language.tag.to_string(),
                name: monolingual_name(ctx.target_language, ctx.ui_language),
                download_url: None,
            });
        }

        if ctx.layout.is_bilingual() {
            ctx.subtitles.push(SubtitleFile {
                path: bilingual_path.clone(),
                language: "bilingual".to_string(),
                name: match ctx.ui_language {
                    UiLanguage::English => "Bilingual Subtitle".to_string(),
                    UiLanguage::SimplifiedChinese => "双语字幕".to_string(),
                },
                download_url: None,
            });
        }

        // The dubbing stage reads the richest subtitle available.
        ctx.tts_source = Some(match ctx.layout {
            SubtitleLayout::BilingualTranslationOnTop
            | SubtitleLayout::BilingualTranslationOnBottom => bilingual_path,
            SubtitleLayout::TargetOnly => target_srt,
            SubtitleLayout::OriginOnly => origin_srt,
        });

        Ok(())
    }
}

struct SplitOutput {
    origin_srt: String,
    origin_text: String,
    target_srt: String,
    target_text: String,
}

/// Split bilingual blocks into per-language SRT and plain-text content.
/// The translation is the block's top content line iff the layout puts it
/// on top; single-line blocks carry only the origin sentence.
fn split_bilingual(content: &str, translation_on_top: bool) -> SplitOutput {
    let mut out = SplitOutput {
        origin_srt: String::new(),
        origin_text: String::new(),
        target_srt: String::new(),
        target_text: String::new(),
    };

    for block in parse_srt(content) {
        let (origin_line, target_line) = if block.lines.len() >= 2 {
            if translation_on_top {
                (block.lines[1].clone(), Some(block.lines[0].clone()))
            } else {
                (block.lines[0].clone(), Some(block.lines[1].clone()))
            }
        } else {
            (block.lines[0].clone(), None)
        };

        out.origin_srt.push_str(
            &ParsedBlock {
                lines: vec![origin_line.clone()],
                ..block.clone()
            }
            .render(),
        );
        out.origin_text.push_str(&origin_line);
        out.origin_text.push('\n');

        if let Some(target_line) = target_line {
            out.target_srt.push_str(
                &ParsedBlock {
                    lines: vec![target_line.clone()],
                    ..block.clone()
                }
                .render(),
            );
            out.target_text.push_str(&target_line);
            out.target_text.push('\n');
        }
    }

    out
}

fn monolingual_name(language: &Language, ui: UiLanguage) -> String {
    match ui {
        UiLanguage::English => format!("{} Subtitle", language.english_name),
        UiLanguage::SimplifiedChinese => format!("{} 单语字幕", language.chinese_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BILINGUAL: &str = "1\n00:00:00,000 --> 00:00:01,000\nhello world\n你好世界\n\n\
                             2\n00:00:01,000 --> 00:00:02,000\nsecond\n第二\n\n";

    #[test]
    fn translation_on_bottom_assigns_lines() {
        let split = split_bilingual(BILINGUAL, false);
        let origin = parse_srt(&split.origin_srt);
        let target = parse_srt(&split.target_srt);
        assert_eq!(origin[0].lines, vec!["hello world"]);
        assert_eq!(target[0].lines, vec!["你好世界"]);
        assert_eq!(split.origin_text, "hello world\nsecond\n");
        assert_eq!(split.target_text, "你好世界\n第二\n");
    }

    #[test]
    fn translation_on_top_flips_assignment() {
        let split = split_bilingual(BILINGUAL, true);
        let origin = parse_srt(&split.origin_srt);
        let target = parse_srt(&split.target_srt);
        assert_eq!(origin[0].lines, vec!["你好世界"]);
        assert_eq!(target[0].lines, vec!["hello world"]);
    }

    #[test]
    fn timestamps_survive_the_split() {
        let split = split_bilingual(BILINGUAL, false);
        let origin = parse_srt(&split.origin_srt);
        assert_eq!(origin[1].start.to_string(), "00:00:01,000");
        assert_eq!(origin[1].end.to_string(), "00:00:02,000");
    }

    #[test]
    fn single_line_blocks_have_no_target() {
        let content = "1\n00:00:00,000 --> 00:00:01,000\nonly origin\n\n";
        let split = split_bilingual(content, false);
        assert!(parse_srt(&split.target_srt).is_empty());
        assert_eq!(split.origin_text, "only origin\n");
    }

    #[test]
    fn display_names_follow_ui_language() {
        let en = Language::from_tag("en").unwrap();
        assert_eq!(monolingual_name(en, UiLanguage::English), "English Subtitle");
        assert_eq!(monolingual_name(en, UiLanguage::SimplifiedChinese), "英语 单语字幕");
    }
}
