//! Data models for harvested articles and the catalog built from them.
//!
//! - [`CandidateLink`]: a homepage anchor that looks like a dated article
//! - [`ArticleIdentity`]: where a candidate lives on the site and on disk
//! - [`ArticleRecord`]: the normalized article with its bilingual metadata
//! - [`ArticleMeta`]: the versioned sidecar written next to every stored article
//! - [`CatalogEntry`]: one row of the persisted `articles.json` catalog

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Current sidecar layout. Sidecars with another version are ignored and the
/// cache checker falls back to reading the stored markup.
pub const META_VERSION: u32 = 1;

/// A homepage anchor tentatively identified as a dated article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    /// The raw `href` as it appeared in the markup.
    pub href: String,
    /// Visible anchor text, whitespace-collapsed.
    pub title_hint: String,
    /// Absolute URL without query, trailing slash, or locale suffix.
    pub canonical_url: String,
}

/// Where a candidate lives, derived purely from its canonical URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleIdentity {
    pub canonical_url: String,
    /// The side-by-side edition actually fetched.
    pub bilingual_url: String,
    pub date: NaiveDate,
    /// `false` when `date` is the run-date fallback.
    pub date_from_url: bool,
    pub slug: String,
    pub storage_path: PathBuf,
    pub meta_path: PathBuf,
    /// `storage_path` relative to the output root, with `/` separators.
    pub relative_url: String,
}

/// Why an article record exists in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum ArticleStatus {
    New,
    Cached,
    StaleRefetched,
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Cached => "CACHED",
            Self::StaleRefetched => "STALE-REFETCHED",
        };
        f.write_str(s)
    }
}

/// A metadata field that fell through every extraction heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedField {
    TitleNative,
    TitleForeign,
    Author,
}

/// A normalized article, fresh or recovered from the local store.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    pub title_native: String,
    /// May be empty when no heuristic found the foreign-language headline.
    pub title_foreign: String,
    pub author: String,
    pub date: NaiveDate,
    /// Sanitized article body. Empty for records recovered from cache.
    pub content_fragment: String,
    /// The bilingual URL the article was fetched from.
    pub source_url: String,
    pub status: ArticleStatus,
    pub degraded: Vec<DegradedField>,
    /// Relative path of the stored article under the output root.
    pub relative_url: String,
}

impl ArticleRecord {
    pub fn to_meta(&self, canonical_url: &str, harvested_at: DateTime<Utc>) -> ArticleMeta {
        ArticleMeta {
            version: META_VERSION,
            title_native: self.title_native.clone(),
            title_foreign: self.title_foreign.clone(),
            author: self.author.clone(),
            date: self.date,
            source_url: self.source_url.clone(),
            canonical_url: canonical_url.to_string(),
            degraded: self.degraded.clone(),
            harvested_at,
        }
    }

    pub fn to_catalog_entry(&self) -> CatalogEntry {
        CatalogEntry {
            title_native: self.title_native.clone(),
            title_foreign: self.title_foreign.clone(),
            url: self.relative_url.clone(),
            date: self.date,
            author: self.author.clone(),
            status: self.status,
        }
    }
}

/// Sidecar metadata persisted as `<slug>.json` beside `<slug>.html`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleMeta {
    pub version: u32,
    pub title_native: String,
    pub title_foreign: String,
    pub author: String,
    pub date: NaiveDate,
    pub source_url: String,
    pub canonical_url: String,
    #[serde(default)]
    pub degraded: Vec<DegradedField>,
    pub harvested_at: DateTime<Utc>,
}

impl ArticleMeta {
    /// Rebuild a cached record. The content fragment stays on disk.
    pub fn into_record(self, relative_url: String, status: ArticleStatus) -> ArticleRecord {
        ArticleRecord {
            title_native: self.title_native,
            title_foreign: self.title_foreign,
            author: self.author,
            date: self.date,
            content_fragment: String::new(),
            source_url: self.source_url,
            status,
            degraded: self.degraded,
            relative_url,
        }
    }
}

/// One row of the persisted catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title_native: String,
    pub title_foreign: String,
    /// Path of the stored article relative to the output root.
    pub url: String,
    pub date: NaiveDate,
    pub author: String,
    pub status: ArticleStatus,
}

/// A page of rendered markup returned by a fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL after navigation.
    pub url: String,
    pub html: String,
    /// Browser/document title.
    pub title: String,
}

/// Relative `/`-separated form of `path` under `root`.
pub fn relative_url(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ArticleRecord {
        ArticleRecord {
            title_native: "标题示例".into(),
            title_foreign: "Example Headline".into(),
            author: "Jane Doe".into(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            content_fragment: "<p class=\"cn\">正文</p>".into(),
            source_url: "https://cn.nytimes.com/world/20250601/some-slug/dual/".into(),
            status: ArticleStatus::New,
            degraded: vec![],
            relative_url: "articles/20250601/some-slug.html".into(),
        }
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ArticleStatus::StaleRefetched).unwrap();
        assert_eq!(json, "\"STALE-REFETCHED\"");
        assert_eq!(ArticleStatus::Cached.to_string(), "CACHED");
        let back: ArticleStatus = serde_json::from_str("\"NEW\"").unwrap();
        assert_eq!(back, ArticleStatus::New);
    }

    #[test]
    fn test_catalog_entry_serialization() {
        let json = serde_json::to_string(&record().to_catalog_entry()).unwrap();
        assert!(json.contains("\"date\":\"2025-06-01\""));
        assert!(json.contains("\"url\":\"articles/20250601/some-slug.html\""));
        assert!(json.contains("\"status\":\"NEW\""));
    }

    #[test]
    fn test_meta_into_record_keeps_titles() {
        let meta = record().to_meta("https://cn.nytimes.com/world/20250601/some-slug", Utc::now());
        assert_eq!(meta.version, META_VERSION);
        let back = meta.into_record("articles/20250601/some-slug.html".into(), ArticleStatus::Cached);
        assert_eq!(back.title_native, "标题示例");
        assert_eq!(back.title_foreign, "Example Headline");
        assert_eq!(back.status, ArticleStatus::Cached);
        assert!(back.content_fragment.is_empty());
    }

    #[test]
    fn test_relative_url() {
        let root = Path::new("/tmp/site");
        let path = Path::new("/tmp/site/articles/20250601/some-slug.html");
        assert_eq!(relative_url(root, path), "articles/20250601/some-slug.html");
    }
}
