//! Utility functions for text shaping, term matching and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Character-aware truncation for titles, excerpts and log output
//! - Whitespace normalization for scraped titles
//! - Word-boundary aware term matching shared by classification and scoring
//! - File name slugs and writable-directory validation for report output

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// character count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        format!("{}…(+{} chars)", truncate_chars(s, max), total - max)
    }
}

/// Keep at most `max` characters of `s`.
///
/// Scraped Vietnamese text is multi-byte everywhere, so every cap in the
/// pipeline counts characters rather than bytes.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Number of characters (not bytes) in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Collapse runs of whitespace (including newlines and tabs) into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Test whether `term` occurs in `haystack`.
///
/// Both arguments are expected to be lowercase already. Terms of three
/// characters or fewer (`ai`, `war`, `icu`) must sit on word boundaries,
/// otherwise `ai` would match inside `tai` or `hai`. Longer terms match as
/// plain substrings.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    if char_len(term) > 3 {
        return haystack.contains(term);
    }

    haystack.match_indices(term).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Convert a topic into a file-name friendly slug.
///
/// Keeps letters (including accented ones), digits, spaces, `-` and `_`,
/// then joins words with underscores.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(safe_file_stem("bóng đá!"), "bóng_đá");
/// ```
pub fn safe_file_stem(topic: &str) -> String {
    let kept: String = topic
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let stem = kept.split_whitespace().collect::<Vec<_>>().join("_");
    if stem.is_empty() {
        "topic".to_string()
    } else {
        stem
    }
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 chars)"));
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let s = "Đội tuyển bóng đá";
        assert_eq!(truncate_chars(s, 3), "Đội");
        assert_eq!(truncate_chars(s, 100), s);
        assert_eq!(char_len("bóng đá"), 7);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  Quân đội\n\t tập   trận "),
            "Quân đội tập trận"
        );
    }

    #[test]
    fn test_contains_term_short_terms_need_boundaries() {
        assert!(contains_term("ứng dụng ai trong y khoa", "ai"));
        assert!(contains_term("ai thay đổi thế giới", "ai"));
        assert!(!contains_term("thiên tai miền trung", "ai"));
        assert!(!contains_term("hai bệnh viện lớn", "ai"));
        assert!(!contains_term("software update", "war"));
        assert!(contains_term("the war in europe", "war"));
    }

    #[test]
    fn test_contains_term_long_terms_are_substrings() {
        assert!(contains_term("đội tuyển bóng đá việt nam", "bóng đá"));
        assert!(contains_term("blockchains everywhere", "blockchain"));
        assert!(!contains_term("anything", ""));
    }

    #[test]
    fn test_safe_file_stem() {
        assert_eq!(safe_file_stem("bóng đá!"), "bóng_đá");
        assert_eq!(safe_file_stem("AI / blockchain"), "AI_blockchain");
        assert_eq!(safe_file_stem("???"), "topic");
    }
}
