use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// Unicode-aware: letters, digits and underscore are word characters.
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid separator regex"));

/// Normalizes text for matching: strips diacritics, lowercases and trims.
///
/// `normalize("  Aprendizaje Automático ")` gives `"aprendizaje automatico"`.
/// Applying it twice gives the same result as applying it once.
pub fn normalize(text: &str) -> String {
    // Lowercase before decomposing: some lowercase mappings emit combining marks.
    let stripped: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped.trim().to_string()
}

/// Splits normalized text into word tokens, in text order, keeping duplicates.
pub fn tokenize(text: &str) -> Vec<String> {
    let norm = normalize(text);
    NON_WORD
        .split(&norm)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
