//! Language registry and script-aware text helpers.
//!
//! Subtitle timing and layout differ between word-based scripts (tokens
//! separated by spaces) and character-based scripts (CJK, Thai). The
//! distinction is table-driven so adding a language is a one-line change.

/// A supported language, identified by its request tag (e.g. `en`, `zh_cn`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub tag: &'static str,
    pub english_name: &'static str,
    pub chinese_name: &'static str,
    /// Sentence timing matches whole tokens instead of single characters.
    pub word_based: bool,
    /// Layout splitting counts characters instead of space-separated words.
    pub char_split: bool,
}

const LANGUAGES: &[Language] = &[
    Language { tag: "en", english_name: "English", chinese_name: "英语", word_based: true, char_split: false },
    Language { tag: "de", english_name: "German", chinese_name: "德语", word_based: true, char_split: false },
    Language { tag: "tr", english_name: "Turkish", chinese_name: "土耳其语", word_based: true, char_split: false },
    Language { tag: "ru", english_name: "Russian", chinese_name: "俄语", word_based: true, char_split: false },
    Language { tag: "zh_cn", english_name: "Simplified Chinese", chinese_name: "简体中文", word_based: false, char_split: true },
    Language { tag: "zh_tw", english_name: "Traditional Chinese", chinese_name: "繁体中文", word_based: false, char_split: true },
    Language { tag: "ja", english_name: "Japanese", chinese_name: "日语", word_based: false, char_split: true },
    Language { tag: "ko", english_name: "Korean", chinese_name: "韩语", word_based: false, char_split: true },
    Language { tag: "th", english_name: "Thai", chinese_name: "泰语", word_based: false, char_split: true },
    Language { tag: "fr", english_name: "French", chinese_name: "法语", word_based: false, char_split: false },
    Language { tag: "es", english_name: "Spanish", chinese_name: "西班牙语", word_based: false, char_split: false },
    Language { tag: "it", english_name: "Italian", chinese_name: "意大利语", word_based: false, char_split: false },
    Language { tag: "pt", english_name: "Portuguese", chinese_name: "葡萄牙语", word_based: false, char_split: false },
    Language { tag: "vi", english_name: "Vietnamese", chinese_name: "越南语", word_based: false, char_split: false },
    Language { tag: "hi", english_name: "Hindi", chinese_name: "印地语", word_based: false, char_split: false },
    Language { tag: "ar", english_name: "Arabic", chinese_name: "阿拉伯语", word_based: false, char_split: false },
];

impl Language {
    /// Look up a language by its request tag.
    pub fn from_tag(tag: &str) -> Option<&'static Language> {
        LANGUAGES.iter().find(|l| l.tag == tag)
    }

    /// The code passed to ASR providers (`zh_cn`/`zh_tw` collapse to `zh`).
    pub fn asr_code(&self) -> &'static str {
        match self.tag {
            "zh_cn" | "zh_tw" => "zh",
            other => other,
        }
    }
}

/// Trim leading and trailing punctuation from a token.
pub fn clean_punctuation(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_ascii_punctuation() || is_wide_punctuation(c))
}

fn is_wide_punctuation(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303F}'   // CJK symbols and punctuation
        | '\u{FF00}'..='\u{FF0F}' // fullwidth forms (punctuation range)
        | '\u{FF1A}'..='\u{FF20}'
        | '\u{FF3B}'..='\u{FF40}'
        | '\u{FF5B}'..='\u{FF65}'
        | '\u{2018}'..='\u{201F}'
        | '\u{2026}')
}

/// Alphabetic in the "western script" sense: Latin (plus extensions),
/// Greek, or Cyrillic. CJK ideographs deliberately return false.
pub fn is_alphabetic(c: char) -> bool {
    matches!(c,
        'A'..='Z' | 'a'..='z'
        | '\u{00C0}'..='\u{024F}'
        | '\u{0370}'..='\u{03FF}'
        | '\u{0400}'..='\u{04FF}')
}

pub fn contains_alphabetic(text: &str) -> bool {
    text.chars().any(is_alphabetic)
}

/// The character sequence used for character-based timestamp matching:
/// everything that is not whitespace or punctuation.
pub fn recognizable_chars(sentence: &str) -> Vec<char> {
    sentence.chars().filter(|c| c.is_alphanumeric()).collect()
}
