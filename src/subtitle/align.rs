//! Timestamp realignment.
//!
//! The LLM rewrites and re-chunks the transcript, so its sentences carry no
//! timings. This module recovers a `(start, end)` per sentence by matching
//! sentence tokens against the recognizer's word-level timestamps.
//!
//! Word-based scripts match whole tokens and look for the longest run of
//! consecutive word numbers; character-based scripts collect every word a
//! sentence character could begin and take the longest `num + 1` chain.
//! Emitted times never precede the end of the previously emitted sentence.

use crate::lang::{self, Language};
use crate::transcribe::Word;

/// A sentence with recovered timings, plus the word list used to split it
/// into short display lines.
#[derive(Debug, Clone)]
pub struct AlignedSentence {
    /// Segment-local start, seconds.
    pub start: f64,
    /// Segment-local end, seconds.
    pub end: f64,
    /// The matched sentence words (placeholders possible for word-based
    /// scripts).
    pub words: Vec<Word>,
    /// Updated floor for the next sentence's timings.
    pub last_ts: f64,
}

/// Recover timings for one sentence. Returns `None` when no usable run of
/// word numbers exists; the caller skips the sentence.
pub fn align_sentence(
    words: &[Word],
    sentence: &str,
    last_ts: f64,
    language: &Language,
) -> Option<AlignedSentence> {
    if words.is_empty() {
        return None;
    }
    if language.word_based {
        align_word_based(words, sentence, last_ts)
    } else {
        align_char_based(words, sentence, last_ts)
    }
}

fn align_word_based(words: &[Word], sentence: &str, last_ts: f64) -> Option<AlignedSentence> {
    let tokens = split_sentence(sentence);
    if tokens.is_empty() {
        return None;
    }

    // Match every sentence token to the first recognizer word with the same
    // text and an admissible start time; the scan cursor resets per token.
    let mut sentence_words: Vec<Word> = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let matched = words
            .iter()
            .find(|w| tokens_equal(&w.text, token) && w.start >= last_ts);
        match matched {
            Some(w) => sentence_words.push(w.clone()),
            None => sentence_words.push(Word::placeholder(token)),
        }
    }

    let (run_start, run_end) = longest_consecutive_run(&sentence_words)?;

    let mut begin = sentence_words[run_start].clone();
    let mut end = sentence_words[run_end - 1].clone();

    // Every token matched and the whole sentence is one consecutive run.
    if run_end - run_start == sentence_words.len() {
        let new_last = if end.end > last_ts { end.end } else { last_ts };
        return Some(AlignedSentence {
            start: begin.start.max(last_ts),
            end: end.end,
            words: sentence_words,
            last_ts: new_last,
        });
    }

    // Grow the run backwards through consecutive word numbers, adopting
    // recognizer words for tokens that failed the first pass.
    if run_start > 0 {
        let mut i = run_start;
        let mut num = begin.num;
        while i > 0 && num > 1 {
            num -= 1;
            let Some(w) = word_by_num(words, num) else {
                break;
            };
            if w.text.is_empty() {
                continue;
            }
            if tokens_equal(&w.text, &sentence_words[i - 1].text) {
                begin = w.clone();
                sentence_words[i - 1] = w.clone();
                i -= 1;
            } else {
                break;
            }
        }
    }

    // And forwards.
    if run_end < sentence_words.len() {
        let max_num = words.last().map(|w| w.num).unwrap_or(0);
        let mut i = run_end;
        let mut num = end.num;
        while i < sentence_words.len() && num < max_num {
            num += 1;
            let Some(w) = word_by_num(words, num) else {
                break;
            };
            if w.text.is_empty() {
                continue;
            }
            if tokens_equal(&w.text, &sentence_words[i].text) {
                end = w.clone();
                sentence_words[i] = w.clone();
                i += 1;
            } else {
                break;
            }
        }
    }

    // Snap to the sentence's own endpoints when the run landed close.
    if let Some(first) = sentence_words.first().filter(|w| !w.is_placeholder()) {
        if begin.num > first.num && begin.num - first.num < 10 {
            begin = first.clone();
        }
    }
    if let Some(last) = sentence_words.last().filter(|w| !w.is_placeholder()) {
        if last.num > end.num && last.num - end.num < 10 {
            end = last.clone();
        }
    }

    emit(begin, end, sentence_words, last_ts)
}

fn align_char_based(words: &[Word], sentence: &str, last_ts: f64) -> Option<AlignedSentence> {
    let chars = lang::recognizable_chars(sentence);
    if chars.is_empty() {
        return None;
    }

    // Candidate words: anything starting with a sentence character, with an
    // admissible start time. Duplicates and out-of-order hits are expected.
    let mut candidates: Vec<Word> = Vec::new();
    for &c in &chars {
        for w in words {
            if w.start >= last_ts && starts_with_char(&w.text, c) {
                candidates.push(w.clone());
            }
        }
    }

    let chain = longest_adjacent_chain(&candidates)?;
    if chain.len() < 2 {
        return None;
    }

    let begin = chain[0].clone();
    let end = chain[chain.len() - 1].clone();
    emit(begin, end, chain, last_ts)
}

fn emit(begin: Word, end: Word, words: Vec<Word>, last_ts: f64) -> Option<AlignedSentence> {
    let start = begin.start.max(last_ts);
    let new_last = if begin.num != end.num && end.end > last_ts {
        end.end
    } else {
        last_ts
    };
    Some(AlignedSentence {
        start,
        end: end.end,
        words,
        last_ts: new_last,
    })
}

/// Longest run of timed words whose numbers increase by exactly one.
/// Placeholders always break a run. Returns `[start, end)`, `None` when no
/// timed word exists at all.
fn longest_consecutive_run(words: &[Word]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    let mut current_start: Option<usize> = None;

    for (i, word) in words.iter().enumerate() {
        if word.is_placeholder() {
            current_start = None;
            continue;
        }
        match current_start {
            Some(start) if word.num == words[i - 1].num + 1 => {
                let len = i + 1 - start;
                if best.map(|(s, e)| e - s).unwrap_or(0) < len {
                    best = Some((start, i + 1));
                }
            }
            _ => {
                current_start = Some(i);
                if best.is_none() {
                    best = Some((i, i + 1));
                }
            }
        }
    }

    best
}

/// Longest chain of candidate words adjacent by `num + 1`, reconstructed in
/// order. Standard O(n²) DP.
fn longest_adjacent_chain(words: &[Word]) -> Option<Vec<Word>> {
    if words.is_empty() {
        return None;
    }

    let n = words.len();
    let mut dp = vec![1usize; n];
    let mut prev = vec![usize::MAX; n];
    let mut best_end = 0usize;

    for i in 1..n {
        for j in 0..i {
            if words[i].num == words[j].num + 1 && dp[i] < dp[j] + 1 {
                dp[i] = dp[j] + 1;
                prev[i] = j;
            }
        }
        if dp[i] > dp[best_end] {
            best_end = i;
        }
    }

    let mut chain = Vec::with_capacity(dp[best_end]);
    let mut i = best_end;
    loop {
        chain.push(words[i].clone());
        if prev[i] == usize::MAX {
            break;
        }
        i = prev[i];
    }
    chain.reverse();
    Some(chain)
}

/// Tokenize a word-based sentence: whitespace split, punctuation trimmed.
pub fn split_sentence(sentence: &str) -> Vec<String> {
    sentence
        .split_whitespace()
        .map(|t| lang::clean_punctuation(t).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn tokens_equal(a: &str, b: &str) -> bool {
    let a = lang::clean_punctuation(a);
    let b = lang::clean_punctuation(b);
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

fn starts_with_char(text: &str, c: char) -> bool {
    text.chars()
        .next()
        .map(|first| first == c || first.eq_ignore_ascii_case(&c))
        .unwrap_or(false)
}

fn word_by_num(words: &[Word], num: usize) -> Option<&Word> {
    words
        .binary_search_by(|w| w.num.cmp(&num))
        .ok()
        .map(|i| &words[i])
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

    fn word(num: usize, text: &str, start: f64, end: f64) -> Word {
        Word {
            num,
            text: text.to_string(),
            start,
            end,
        }
    }

    /// Ten words at 0.1 s per word, as in a short English utterance.
    fn fox_words() -> Vec<Word> {
        let texts = ["the", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog", "."];
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| word(i + 1, t, i as f64 * 0.1, (i + 1) as f64 * 0.1))
            .collect()
    }

    #[test]
    fn full_sentence_prefix_aligns_to_word_times() {
        let aligned =
            align_sentence(&fox_words(), "the quick brown fox jumps", 0.0, english()).unwrap();
        assert!((aligned.start - 0.0).abs() < 1e-9);
        assert!((aligned.end - 0.5).abs() < 1e-9);
        assert!((aligned.last_ts - 0.5).abs() < 1e-9);
    }

    #[test]
    fn second_sentence_respects_previous_end() {
        let words = fox_words();
        let first = align_sentence(&words, "the quick brown fox jumps", 0.0, english()).unwrap();
        let second =
            align_sentence(&words, "over the lazy dog", first.last_ts, english()).unwrap();
        assert!(second.start >= first.end);
        assert!((second.start - 0.5).abs() < 1e-9);
        assert!((second.end - 0.9).abs() < 1e-9);
    }

    #[test]
    fn unmatched_sentence_is_rejected() {
        assert!(align_sentence(&fox_words(), "completely unrelated words", 0.0, english()).is_none());
        assert!(align_sentence(&fox_words(), "", 0.0, english()).is_none());
        assert!(align_sentence(&[], "anything", 0.0, english()).is_none());
    }

    #[test]
    fn matching_ignores_case_and_punctuation() {
        let aligned = align_sentence(&fox_words(), "The QUICK, brown fox!", 0.0, english()).unwrap();
        assert!((aligned.start - 0.0).abs() < 1e-9);
        assert!((aligned.end - 0.4).abs() < 1e-9);
    }

    #[test]
    fn rewritten_token_becomes_placeholder_but_run_survives() {
        // "sly" never appears in the recognizer output; the run around it
        // still anchors the sentence.
        let aligned = align_sentence(&fox_words(), "the sly quick brown fox", 0.0, english());
        let aligned = aligned.unwrap();
        assert!(aligned.end > aligned.start);
        assert!(aligned.words.iter().any(|w| w.is_placeholder()));
    }

    #[test]
    fn start_is_clamped_to_last_ts() {
        let aligned = align_sentence(&fox_words(), "over the lazy dog", 0.62, english()).unwrap();
        assert!(aligned.start >= 0.62);
    }

    #[test]
    fn consecutive_run_ignores_placeholders() {
        let words = vec![
            word(3, "a", 0.0, 0.1),
            Word::placeholder("x"),
            word(4, "b", 0.1, 0.2),
            word(5, "c", 0.2, 0.3),
        ];
        let (start, end) = longest_consecutive_run(&words).unwrap();
        assert_eq!((start, end), (2, 4));
    }

    #[test]
    fn consecutive_run_requires_a_timed_word() {
        let words = vec![Word::placeholder("x"), Word::placeholder("y")];
        assert!(longest_consecutive_run(&words).is_none());
    }

    #[test]
    fn char_based_alignment_uses_adjacent_chain() {
        let words = vec![
            word(1, "你", 0.0, 0.2),
            word(2, "好", 0.2, 0.4),
            word(3, "世", 0.4, 0.6),
            word(4, "界", 0.6, 0.8),
        ];
        let aligned = align_sentence(&words, "你好，世界。", 0.0, chinese()).unwrap();
        assert!((aligned.start - 0.0).abs() < 1e-9);
        assert!((aligned.end - 0.8).abs() < 1e-9);
        assert_eq!(aligned.words.len(), 4);
    }

    #[test]
    fn char_based_tolerates_duplicate_hits() {
        // "好" appears twice in the recognizer output; the chain picks the
        // one that keeps numbers adjacent.
        let words = vec![
            word(1, "好", 0.0, 0.2),
            word(2, "你", 0.2, 0.4),
            word(3, "好", 0.4, 0.6),
            word(4, "吗", 0.6, 0.8),
        ];
        let aligned = align_sentence(&words, "你好吗", 0.0, chinese()).unwrap();
        assert!((aligned.start - 0.2).abs() < 1e-9);
        assert!((aligned.end - 0.8).abs() < 1e-9);
        assert_eq!(aligned.words.len(), 3);
    }

    #[test]
    fn char_based_single_hit_is_rejected() {
        let words = vec![word(1, "你", 0.0, 0.2), word(5, "天", 1.0, 1.2)];
        assert!(align_sentence(&words, "你好", 0.0, chinese()).is_none());
    }

    #[test]
    fn non_increasing_numbers_reject_sentence() {
        // All candidate hits share one number, so no chain of length 2
        // exists.
        let words = vec![
            word(7, "你", 0.0, 0.2),
            word(7, "好", 0.2, 0.4),
        ];
        assert!(align_sentence(&words, "你好", 0.0, chinese()).is_none());
    }

    #[test]
    fn emitted_times_are_monotone_across_sentences() {
        let words = fox_words();
        let mut last_ts = 0.0;
        let mut previous_end = 0.0;
        for sentence in ["the quick brown", "fox jumps over", "the lazy dog"] {
            let aligned = align_sentence(&words, sentence, last_ts, english()).unwrap();
            assert!(aligned.start >= previous_end);
            assert!(aligned.end >= aligned.start);
            previous_end = aligned.end;
            last_ts = aligned.last_ts;
        }
    }
}
