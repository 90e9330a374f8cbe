// Subtitle model and file-format plumbing.
//
// Two block shapes flow through the pipeline: `SrtBlock` carries the
// semantic origin/target sentence pair produced by the retiming step, and
// `ParsedBlock` is the raw shape read back from any SRT on disk.

pub mod align;
pub mod ass;
pub mod merge;
pub mod split;
pub mod timing;

use crate::error::{DubflowError, Result};
use timing::SrtTimestamp;

/// A subtitle block with semantic sentence roles.
#[derive(Debug, Clone)]
pub struct SrtBlock {
    pub index: usize,
    pub start: SrtTimestamp,
    pub end: SrtTimestamp,
    pub origin: String,
    pub target: String,
}

impl SrtBlock {
    pub fn timestamp_line(&self) -> String {
        format!("{} --> {}", self.start, self.end)
    }

    /// Render as a bilingual block. The translation goes on the top line
    /// when `translation_on_top` is set.
    pub fn render_bilingual(&self, translation_on_top: bool) -> String {
        let (first, second) = if translation_on_top {
            (&self.target, &self.origin)
        } else {
            (&self.origin, &self.target)
        };
        format!("{}\n{}\n{}\n{}\n\n", self.index, self.timestamp_line(), first, second)
    }
}

/// A raw SRT block as read from disk: index, timing, 1..n content lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBlock {
    pub index: usize,
    pub start: SrtTimestamp,
    pub end: SrtTimestamp,
    pub lines: Vec<String>,
}

impl ParsedBlock {
    pub fn render(&self) -> String {
        format!(
            "{}\n{} --> {}\n{}\n\n",
            self.index,
            self.start,
            self.end,
            self.lines.join("\n")
        )
    }
}

/// Parse a `start --> end` timestamp line.
pub fn parse_timestamp_line(line: &str) -> Result<(SrtTimestamp, SrtTimestamp)> {
    let (start, end) = line
        .split_once("-->")
        .ok_or_else(|| DubflowError::Format(format!("invalid timestamp line: {:?}", line)))?;
    Ok((start.trim().parse()?, end.trim().parse()?))
}

/// Parse SRT content into raw blocks. Malformed blocks are dropped rather
/// than failing the whole file.
pub fn parse_srt(content: &str) -> Vec<ParsedBlock> {
    let mut blocks = Vec::new();
    let mut lines = content.lines().peekable();

    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(index) = line.parse::<usize>() else {
            continue;
        };
        let Some(timestamp_line) = lines.next() else {
            break;
        };
        let Ok((start, end)) = parse_timestamp_line(timestamp_line) else {
            continue;
        };

        let mut content_lines = Vec::new();
        for text_line in lines.by_ref() {
            if text_line.trim().is_empty() {
                break;
            }
            content_lines.push(text_line.to_string());
        }
        if content_lines.is_empty() {
            continue;
        }

        blocks.push(ParsedBlock {
            index,
            start,
            end,
            lines: content_lines,
        });
    }

    blocks
}

/// One block of the LLM's no-timestamp payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NoTsBlock {
    pub index: usize,
    pub translation: String,
    pub origin: String,
}

/// Parse the validated LLM payload (`index / translation / [original]`).
pub fn parse_no_ts_payload(content: &str) -> Vec<NoTsBlock> {
    let lines: Vec<&str> = content.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() {
            i += 1;
            continue;
        }
        match line.parse::<i64>() {
            Ok(n) if n > 0 && i + 2 < lines.len() => {
                let translation = lines[i + 1].trim().to_string();
                let origin = lines[i + 2].trim();
                let origin = origin.strip_prefix('[').unwrap_or(origin);
                let origin = origin.strip_suffix(']').unwrap_or(origin);
                blocks.push(NoTsBlock {
                    index: n as usize,
                    translation,
                    origin: origin.to_string(),
                });
                i += 3;
            }
            _ => {
                i += 1;
            }
        }
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilingual_rendering_honors_layout() {
        let block = SrtBlock {
            index: 1,
            start: SrtTimestamp::from_millis(0),
            end: SrtTimestamp::from_millis(1500),
            origin: "hello world".to_string(),
            target: "你好世界".to_string(),
        };
        let on_bottom = block.render_bilingual(false);
        assert_eq!(on_bottom, "1\n00:00:00,000 --> 00:00:01,500\nhello world\n你好世界\n\n");
        let on_top = block.render_bilingual(true);
        assert!(on_top.contains("你好世界\nhello world"));
    }

    #[test]
    fn parse_srt_round_trips() {
        let content = "1\n00:00:00,000 --> 00:00:01,500\nhello world\n你好世界\n\n\
                       2\n00:00:01,500 --> 00:00:03,000\nsecond line\n\n";
        let blocks = parse_srt(content);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines, vec!["hello world", "你好世界"]);
        assert_eq!(blocks[1].lines, vec!["second line"]);
        assert_eq!(blocks[1].start.as_millis(), 1500);

        let rendered: String = blocks.iter().map(|b| b.render()).collect();
        assert_eq!(parse_srt(&rendered), blocks);
    }

    #[test]
    fn parse_srt_drops_malformed_blocks() {
        let content = "1\nnot a timestamp\ntext\n\n2\n00:00:01,000 --> 00:00:02,000\nkept\n\n";
        let blocks = parse_srt(content);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec!["kept"]);
    }

    #[test]
    fn parse_no_ts_payload_strips_brackets() {
        let payload = "1\n你好\n[hello there]\n\n2\n世界\n[world]\n";
        let blocks = parse_no_ts_payload(payload);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].origin, "hello there");
        assert_eq!(blocks[0].translation, "你好");
        assert_eq!(blocks[1].index, 2);
    }

    #[test]
    fn parse_no_ts_payload_skips_noise_lines() {
        let payload = "Here are the subtitles:\n1\nHallo\n[hello]\n";
        let blocks = parse_no_ts_payload(payload);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].origin, "hello");
    }
}
