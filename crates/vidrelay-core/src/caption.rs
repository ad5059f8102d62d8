// SPDX-FileCopyrightText: 2026 Vidrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caption normalisation shared by the media library and duplicate detection.

use std::sync::LazyLock;

use regex::Regex;

static URLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:https?|ftp)://\S+").expect("url pattern is valid"));
static MENTIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[A-Za-z0-9_]+").expect("mention pattern is valid"));
static SPECIALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s\[\]]").expect("special pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Strips links, `@mentions`, and punctuation (brackets survive) from a caption,
/// drops empty `[]` pairs, and collapses whitespace.
///
/// Word characters are Unicode-aware, so non-Latin titles are preserved.
pub fn clean_caption(caption: &str) -> String {
    let s = URLS.replace_all(caption, "");
    let s = MENTIONS.replace_all(&s, "");
    let s = SPECIALS.replace_all(&s, "");
    let s = s.replace("[]", "");
    WHITESPACE.replace_all(&s, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_links_and_mentions() {
        let cleaned = clean_caption("Big Movie 2024 https://t.me/abc @uploader_bot join!");
        assert_eq!(cleaned, "Big Movie 2024 join");
    }

    #[test]
    fn keeps_brackets_with_content() {
        assert_eq!(clean_caption("Show [1080p] [] - S01E02"), "Show [1080p] S01E02");
    }

    #[test]
    fn collapses_whitespace_and_newlines() {
        assert_eq!(clean_caption("  a \n\n b\t\tc  "), "a b c");
    }

    #[test]
    fn empty_after_cleaning() {
        assert_eq!(clean_caption("@only_mention http://x.y/z ***"), "");
    }

    #[test]
    fn unicode_words_survive() {
        assert_eq!(clean_caption("Película ~ Año 2001!"), "Película Año 2001");
    }

    proptest::proptest! {
        #[test]
        fn output_is_trimmed_and_single_spaced(input in ".{0,80}") {
            let cleaned = clean_caption(&input);
            proptest::prop_assert_eq!(cleaned.trim(), cleaned.as_str());
            proptest::prop_assert!(!cleaned.contains("  "));
            proptest::prop_assert!(!cleaned.contains("http://"));
        }
    }
}
