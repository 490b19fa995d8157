/*!
 * Language utilities for script detection and language names.
 *
 * The extraction whitelist and the post-translation leakage check both need
 * to know whether a string contains source-language (Japanese) script; the
 * prompt builder needs human-readable language names for ISO codes.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Hiragana, Katakana, CJK ideographs, and full-width forms
static JAPANESE_SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{3040}-\u{309F}\u{30A0}-\u{30FF}\u{4E00}-\u{9FFF}\u{FF00}-\u{FFEF}]").unwrap()
});

/// Check if text contains any Japanese script characters
pub fn has_japanese(text: &str) -> bool {
    JAPANESE_SCRIPT.is_match(text)
}

/// Count Japanese script characters in text
pub fn japanese_char_count(text: &str) -> usize {
    JAPANESE_SCRIPT.find_iter(text).count()
}

/// Leakage check: does a translation still carry residual source script?
///
/// A handful of characters can be a deliberately kept honorific or name, so a
/// single match is tolerated; two or more count as leakage.
pub fn has_source_leakage(translated: &str) -> bool {
    japanese_char_count(translated) >= 2
}

/// Get the English display name for an ISO 639-1 language code.
/// Falls back to the code itself when the code is unknown.
pub fn get_language_name(code: &str) -> String {
    isolang::Language::from_639_1(&code.to_lowercase())
        .map(|lang| lang.to_name().to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Check whether two language codes refer to the same language
pub fn language_codes_match(a: &str, b: &str) -> bool {
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    let lang_a = isolang::Language::from_639_1(&a.to_lowercase())
        .or_else(|| isolang::Language::from_639_3(&a.to_lowercase()));
    let lang_b = isolang::Language::from_639_1(&b.to_lowercase())
        .or_else(|| isolang::Language::from_639_3(&b.to_lowercase()));
    match (lang_a, lang_b) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
