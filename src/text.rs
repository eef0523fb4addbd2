//! Character-class helpers shared by the merger and the heading classifier.

use unicode_normalization::UnicodeNormalization;

/// Core CJK ideograph block used by the heading taxonomy (U+4E00..=U+9FA5).
pub fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and Extension A
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    // Extensions B-F
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana and Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}

pub fn contains_cjk(s: &str) -> bool {
    s.chars().any(is_cjk)
}

/// Number of core CJK ideographs in `s`.
pub fn count_cjk(s: &str) -> usize {
    s.chars().filter(|c| is_cjk(*c)).count()
}

/// Keep only CJK ideographs and ASCII letters.
pub fn ideographs_and_letters(s: &str) -> String {
    s.chars()
        .filter(|c| is_cjk(*c) || c.is_ascii_alphabetic())
        .collect()
}

/// NFKC-normalize, then keep only CJK ideographs and ASCII letters.
///
/// Used to compare running headers whose punctuation or width forms vary.
pub fn normalized_key(s: &str) -> String {
    let folded: String = s.nfkc().collect();
    ideographs_and_letters(&folded)
}
