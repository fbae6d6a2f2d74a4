//! Text normalization and approximate matching for hand-authored slides.
//!
//! Handles Unicode compatibility forms, whitespace runs, punctuation-insensitive
//! label keys and bounded edit distance.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse whitespace runs (including newlines) into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Regex to strip report boilerplate from the front of slide titles.
static TITLE_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(slide|performance|report|dashboard|analysis)\b[\s:\-–—]*").unwrap()
});

/// Maximum length of a title taken from slide text.
const MAX_TITLE_CHARS: usize = 200;

/// Lowercase, NFKC-normalized text with whitespace runs collapsed.
///
/// Punctuation is kept, so "Value-Mart" still matches "value-mart".
pub fn fold(text: &str) -> String {
    let normalized: String = text.nfkc().collect::<String>().to_lowercase();
    WHITESPACE_COLLAPSE_REGEX
        .replace_all(normalized.trim(), " ")
        .into_owned()
}

/// Punctuation-insensitive key for labels and headers.
///
/// `"Reach/Views:"` and `"reach views"` both become `"reach views"`.
pub fn label_key(text: &str) -> String {
    fold(text)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `needle` occurs in `haystack` as a run of whole words.
///
/// Both arguments must already be label keys.
pub fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    format!(" {} ", haystack).contains(&format!(" {} ", needle))
}

/// Remove control characters and collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let without_controls: String = text.chars().filter(|c| !c.is_control() || c.is_whitespace()).collect();
    WHITESPACE_COLLAPSE_REGEX
        .replace_all(without_controls.trim(), " ")
        .into_owned()
}

/// Turn a slide heading into a record title.
///
/// Strips report prefixes such as "Performance:" and caps the length.
/// Returns `"Untitled"` when nothing is left.
pub fn clean_title(text: &str) -> String {
    let mut title = clean_text(text);
    // "Slide 3 - Report: X" carries more than one prefix.
    loop {
        let stripped = TITLE_PREFIX_REGEX.replace(&title, "").into_owned();
        if stripped == title {
            break;
        }
        title = stripped;
    }
    let title: String = title.chars().take(MAX_TITLE_CHARS).collect();
    let title = title.trim();
    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title.to_string()
    }
}

/// Levenshtein distance between `a` and `b`, or `None` once it exceeds `max`.
pub fn edit_distance_within(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    if a.is_empty() || b.is_empty() {
        let d = a.len().max(b.len());
        return (d <= max).then_some(d);
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
            row_min = row_min.min(curr[j + 1]);
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let d = prev[b.len()];
    (d <= max).then_some(d)
}

/// Smallest edit distance between `keyword` and `text` or any word window
/// of `text` with about as many words as the keyword.
///
/// Both arguments must already be folded.
pub fn fuzzy_distance(text: &str, keyword: &str, max: usize) -> Option<usize> {
    let mut best = edit_distance_within(text, keyword, max);
    if best == Some(0) {
        return best;
    }

    let words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();
    let kw_words = keyword.split(' ').filter(|w| !w.is_empty()).count().max(1);

    // Typos can split or merge words, so also try one word more or fewer.
    for width in [kw_words.saturating_sub(1), kw_words, kw_words + 1] {
        if width == 0 || width > words.len() {
            continue;
        }
        for window in words.windows(width) {
            let candidate = window.join(" ");
            if let Some(d) = edit_distance_within(&candidate, keyword, max) {
                if best.map_or(true, |b| d < b) {
                    best = Some(d);
                }
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold() {
        assert_eq!(fold("  TF  Value-Mart\nFB "), "tf value-mart fb");
        // Fullwidth characters fold to ASCII under NFKC.
        assert_eq!(fold("ＦＢ Page"), "fb page");
    }

    #[test]
    fn test_label_key() {
        assert_eq!(label_key("Reach/Views:"), "reach views");
        assert_eq!(label_key("  No. of   Ads "), "no of ads");
        assert_eq!(label_key("--"), "");
    }

    #[test]
    fn test_contains_phrase_respects_word_boundaries() {
        assert!(contains_phrase("tf value mart fb page", "fb"));
        assert!(contains_phrase("page likes", "page likes"));
        assert!(!contains_phrase("digital campaign", "ig"));
        assert!(!contains_phrase("anything", ""));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("Hello\u{0007}   world\n\tagain"), "Hello world again");
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("Performance: Ramadan Wallposts"), "Ramadan Wallposts");
        assert_eq!(clean_title("Slide - Report: March"), "March");
        assert_eq!(clean_title("Dashboard"), "Untitled");
        assert_eq!(clean_title("Reportage"), "Reportage");
        assert_eq!(clean_title(&"x".repeat(500)).len(), 200);
    }

    #[test]
    fn test_edit_distance_within() {
        assert_eq!(edit_distance_within("kitten", "sitting", 3), Some(3));
        assert_eq!(edit_distance_within("kitten", "sitting", 2), None);
        assert_eq!(edit_distance_within("same", "same", 0), Some(0));
        assert_eq!(edit_distance_within("", "ab", 2), Some(2));
        assert_eq!(edit_distance_within("a", "abcd", 2), None);
    }

    #[test]
    fn test_fuzzy_distance_windows() {
        let text = fold("March recap: Hive Markting results");
        assert_eq!(fuzzy_distance(&text, "hive marketing", 2), Some(1));
        assert_eq!(fuzzy_distance(&text, "kol engagement", 2), None);

        // Merged words still match through a narrower window.
        let text = fold("Promotionposts overview");
        assert_eq!(fuzzy_distance(&text, "promotion posts", 2), Some(1));
    }
}
