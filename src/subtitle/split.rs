//! Short-line re-splitting with prorated timings.
//!
//! Long retimed sentences are broken into reading-sized lines. Line times
//! come from the underlying word timings, clamped so lines never overlap
//! each other, the sentence bounds, or the previous sentence.

use crate::transcribe::Word;

/// One short display line carved out of a sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortLine {
    /// Segment-local start, seconds.
    pub start: f64,
    /// Segment-local end, seconds.
    pub end: f64,
    pub text: String,
}

/// Per-line word budget for a sentence of `len` words at display width
/// `max_word_one_line`: the smallest k in 2..=5 that fits determines a
/// near-even split.
pub fn line_width(len: usize, max_word_one_line: usize) -> usize {
    if len <= max_word_one_line {
        return max_word_one_line;
    }
    for k in 2..=5 {
        if len <= k * max_word_one_line {
            return len.div_ceil(k) + 1;
        }
    }
    max_word_one_line
}

/// Split one retimed sentence into short lines.
///
/// `sentence_start`/`sentence_end` is the sentence's recovered timing and
/// `prev_end` the end of the previously emitted sentence. A sentence at or
/// under the width limit stays whole.
pub fn split_short_lines(
    sentence: &str,
    words: &[Word],
    sentence_start: f64,
    sentence_end: f64,
    prev_end: f64,
    max_word_one_line: usize,
) -> Vec<ShortLine> {
    if words.is_empty() {
        return Vec::new();
    }

    if words.len() <= max_word_one_line {
        return vec![ShortLine {
            start: sentence_start,
            end: sentence_end,
            text: sentence.to_string(),
        }];
    }

    let width = line_width(words.len(), max_word_one_line).max(1);
    let mut lines = Vec::new();
    let mut previous_line_end = 0.0_f64;

    for chunk in words.chunks(width) {
        let floor = sentence_start.max(prev_end).max(previous_line_end);
        let start = chunk[0].start.max(floor);
        let end = chunk
            .iter()
            .fold(start, |acc, w| acc.max(w.end))
            .min(sentence_end)
            .max(start);
        let text = chunk
            .iter()
            .map(|w| w.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        lines.push(ShortLine { start, end, text });
        previous_line_end = end;
    }

    lines
}
