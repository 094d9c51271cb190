//! Query highlighting for result bodies.
//!
//! Matching ignores case and accents, like the search itself, but the output
//! keeps the original text. Distinct tokens are applied longest first and
//! overlapping matches merge into one span.

use std::ops::Range;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Byte ranges of `text` covered by any of `tokens`, sorted and disjoint.
///
/// Tokens are expected in normalized form (as produced by `tokenize`).
pub fn highlight_ranges(text: &str, tokens: &[String]) -> Vec<Range<usize>> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    // Folded copy of the text; `owner[b]` is the char index that produced folded byte `b`.
    let mut folded = String::with_capacity(text.len());
    let mut owner: Vec<usize> = Vec::with_capacity(text.len());
    for (idx, (_, c)) in chars.iter().enumerate() {
        for f in c.to_lowercase().nfd().filter(|m| !is_combining_mark(*m)) {
            let f = fold_sigma(f);
            folded.push(f);
            owner.extend(std::iter::repeat(idx).take(f.len_utf8()));
        }
    }

    let mut ordered: Vec<String> = tokens
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| t.chars().map(fold_sigma).collect())
        .collect();
    ordered.sort_unstable_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    ordered.dedup();

    let mut marked = vec![false; chars.len()];
    for token in &ordered {
        for (start, m) in folded.match_indices(token.as_str()) {
            let first = owner[start];
            let last = owner[start + m.len() - 1];
            marked[first..=last].iter_mut().for_each(|flag| *flag = true);
        }
    }

    let mut ranges: Vec<Range<usize>> = Vec::new();
    for (idx, (byte, c)) in chars.iter().enumerate() {
        if !marked[idx] {
            continue;
        }
        let end = byte + c.len_utf8();
        match ranges.last_mut() {
            Some(last) if last.end == *byte => last.end = end,
            _ => ranges.push(*byte..end),
        }
    }
    ranges
}

// Whole-string lowercasing turns a word-final Σ into ς, per-char lowercasing into σ.
fn fold_sigma(c: char) -> char {
    if c == 'ς' {
        'σ'
    } else {
        c
    }
}

/// Escapes `text` as HTML, wrapping highlighted spans in `<mark>`.
pub fn highlight_html(text: &str, tokens: &[String]) -> String {
    let mut html = String::with_capacity(text.len() + 16);
    let mut cursor = 0;
    for range in highlight_ranges(text, tokens) {
        html.push_str(&html_escape::encode_text(&text[cursor..range.start]));
        html.push_str("<mark>");
        html.push_str(&html_escape::encode_text(&text[range.clone()]));
        html.push_str("</mark>");
        cursor = range.end;
    }
    html.push_str(&html_escape::encode_text(&text[cursor..]));
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenize;

    fn toks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matches_ignore_case_and_accents() {
        let text = "La Visión artificial y la vision humana";
        let ranges = highlight_ranges(text, &toks(&["vision"]));
        let spans: Vec<&str> = ranges.iter().map(|r| &text[r.clone()]).collect();
        assert_eq!(spans, vec!["Visión", "vision"]);
    }

    #[test]
    fn overlapping_tokens_merge() {
        let text = "neuronales";
        let ranges = highlight_ranges(text, &toks(&["neuro", "neuronal", "ales"]));
        assert_eq!(ranges, vec![0..text.len()]);
    }

    #[test]
    fn html_is_escaped_around_marks() {
        let html = highlight_html("<b>datos</b> & más datos", &toks(&["datos"]));
        assert_eq!(
            html,
            "&lt;b&gt;<mark>datos</mark>&lt;/b&gt; &amp; más <mark>datos</mark>"
        );
    }

    #[test]
    fn final_sigma_is_highlighted() {
        let text = "ΟΔΟΣ y οδος";
        let tokens = tokenize("ΟΔΟΣ");
        let ranges = highlight_ranges(text, &tokens);
        let spans: Vec<&str> = ranges.iter().map(|r| &text[r.clone()]).collect();
        assert_eq!(spans, vec!["ΟΔΟΣ", "οδος"]);
    }

    #[test]
    fn no_tokens_means_plain_escaped_text() {
        assert_eq!(highlight_html("a < b", &[]), "a &lt; b");
        assert!(highlight_ranges("texto", &toks(&[""])).is_empty());
    }
}
