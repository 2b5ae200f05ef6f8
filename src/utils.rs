//! Utility functions for text classification, string handling, and file system operations.
//!
//! - Script detection (CJK vs. Latin) used for paragraph tagging and title picking
//! - Brand-name detection for rejecting placeholder titles
//! - Whitespace collapsing and log truncation
//! - Directory validation and write-then-rename file output

use crate::errors::Result;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Whether `c` is a CJK ideograph.
///
/// CJK punctuation and full-width forms are excluded: they turn up in
/// English paragraphs too.
pub fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3400..=0x4DBF   // extension A
        | 0x4E00..=0x9FFF // unified ideographs
        | 0xF900..=0xFAFF // compatibility ideographs
        | 0x20000..=0x2FA1F)
}

/// Whether `text` contains any native-script (CJK) character.
pub fn has_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// Whether `text` is made of Latin letters, digits, and basic punctuation only.
pub fn is_latin_only(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty()
        && trimmed.chars().any(|c| c.is_ascii_alphabetic())
        && trimmed.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || c.is_whitespace()
                || ".,:;!?'\"()&%$#@/+-–—’‘“”".contains(c)
        })
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn brand_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether `title` is just a brand name, ignoring punctuation, spacing, and case.
///
/// A title also counts as a brand name when it contains one and carries at
/// most `slack` extra letters or digits (e.g. "NYTimes.com" against "NYTimes").
pub fn is_brand_name(title: &str, brands: &[String], slack: usize) -> bool {
    let key = brand_key(title);
    if key.is_empty() {
        return false;
    }
    brands.iter().map(|b| brand_key(b)).any(|brand| {
        !brand.is_empty()
            && key.contains(&brand)
            && key.chars().count() <= brand.chars().count() + slack
    })
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` characters with an ellipsis and the number
/// of dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}…(+{} bytes)", &s[..idx], s.len() - idx),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    fs::write(&probe_path, b"").await?;
    let _ = fs::remove_file(&probe_path).await;
    info!("Output directory is writable");
    Ok(())
}

/// Write `contents` to `path` through a sibling temp file and a rename, so a
/// reader never observes a partially written file.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.partial", file_name));
    fs::write(&tmp_path, contents).await?;
    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    debug!(bytes = contents.len(), "Wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brands() -> Vec<String> {
        crate::config::BRAND_NAMES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_has_cjk() {
        assert!(has_cjk("标题示例"));
        assert!(has_cjk("Trump 與習近平"));
        assert!(!has_cjk("Only Latin text, 2025."));
        assert!(!has_cjk(""));
    }

    #[test]
    fn test_full_width_punctuation_is_not_cjk() {
        assert!(!is_cjk('，'));
        assert!(!is_cjk('。'));
        assert!(!is_cjk('“'));
        assert!(!has_cjk("The Fed said, “rates fall”，again。"));
        assert!(is_cjk('降'));
    }

    #[test]
    fn test_is_latin_only() {
        assert!(is_latin_only("Why the Fed Cut Rates Again"));
        assert!(is_latin_only("U.S.-China Talks: What's Next?"));
        assert!(!is_latin_only("美联储为何再次降息"));
        assert!(!is_latin_only("2025"));
        assert!(!is_latin_only("   "));
    }

    #[test]
    fn test_is_brand_name_table() {
        let brands = brands();
        let cases = [
            ("The New York Times", 3, true),
            ("the new york times!", 3, true),
            ("NYTimes.com", 3, true),
            ("NYTimes.com", 0, false),
            (" 纽约时报中文网 ", 3, true),
            ("New York Times Reporters Win Award", 3, false),
            ("Why the Fed Cut Rates Again", 3, false),
            ("", 3, false),
        ];
        for (title, slack, expected) in cases {
            assert_eq!(
                is_brand_name(title, &brands, slack),
                expected,
                "title {title:?} slack {slack}"
            );
        }
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  标题\n\t示例  "), "标题 示例");
        assert_eq!(collapse_whitespace("a   b"), "a b");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let result = truncate_for_log("标题示例", 2);
        assert!(result.starts_with("标题"));
        assert!(result.contains("(+6 bytes)"));
    }

    #[tokio::test]
    async fn test_write_atomic_leaves_no_partial_file() {
        let dir = std::env::temp_dir().join(format!("dual_harvest_{}", uuid::Uuid::new_v4()));
        let path = dir.join("20250601").join("some-slug.html");
        write_atomic(&path, b"<html></html>").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html></html>");
        assert!(!path.with_file_name(".some-slug.html.partial").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
