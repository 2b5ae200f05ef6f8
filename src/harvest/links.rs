//! Link discovery and article identity.
//!
//! The homepage is full of navigation and promo links; the only reliable
//! signal that an anchor points at an article is an 8-digit date segment in
//! its `href` (`/world/20250601/some-slug/`).
//!
//! # Filtering
//!
//! An anchor qualifies when it has a non-empty `href`, non-empty text, and a
//! date segment. Qualifying anchors are then dropped, first match wins, when:
//!
//! 1. the exact `href` was already seen on this page
//! 2. the `href` mentions the site's domain without being a full URL
//! 3. the year policy excludes it
//!
//! Survivors are canonicalized and deduplicated again by canonical URL.

use crate::config::SiteProfile;
use crate::errors::Result;
use crate::models::{ArticleIdentity, CandidateLink};
use crate::utils::collapse_whitespace;
use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, instrument};
use url::Url;

/// Folder under the output root holding the article archive.
pub const ARTICLES_DIR: &str = "articles";

static DATE_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d{8}/").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Scan homepage markup for dated article links, in document order.
#[instrument(level = "info", skip_all, fields(bytes = markup.len()))]
pub fn extract_links(markup: &str, site: &SiteProfile, run_date: NaiveDate) -> Vec<CandidateLink> {
    let document = Html::parse_document(markup);
    let mut seen_hrefs: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for anchor in document.select(&ANCHOR) {
        let href = anchor.value().attr("href").unwrap_or_default().trim();
        let title_hint = collapse_whitespace(&anchor.text().collect::<String>());
        if href.is_empty() || title_hint.is_empty() || !DATE_SEGMENT.is_match(href) {
            continue;
        }

        if !seen_hrefs.insert(href.to_string()) {
            debug!(%href, "Skipping duplicate href");
            continue;
        }

        if href.contains(site.domain.as_str()) && !href.starts_with("http") {
            debug!(%href, "Skipping malformed href");
            continue;
        }

        let path = href.split(['?', '#']).next().unwrap_or(href);
        if site.year_policy.excludes(path, run_date) {
            debug!(%href, title = %title_hint, "Skipping link excluded by year policy");
            continue;
        }

        match canonicalize(href, site) {
            Ok(canonical_url) => candidates.push(CandidateLink {
                href: href.to_string(),
                title_hint,
                canonical_url,
            }),
            Err(e) => debug!(%href, error = %e, "Skipping unresolvable href"),
        }
    }

    let links: Vec<CandidateLink> = candidates
        .into_iter()
        .unique_by(|link| link.canonical_url.clone())
        .collect();

    info!(count = links.len(), "Extracted candidate article links");
    links
}

/// Absolute URL with query, fragment, trailing slashes, and locale or
/// bilingual suffix segments removed.
pub fn canonicalize(href: &str, site: &SiteProfile) -> Result<String> {
    let mut url = site.base_url.join(href)?;
    url.set_query(None);
    url.set_fragment(None);

    let origin_len = url.origin().ascii_serialization().len();
    let mut canonical = url.to_string();
    let bilingual = site.bilingual_suffix.trim_matches('/');

    loop {
        while canonical.len() > origin_len && canonical.ends_with('/') {
            canonical.pop();
        }
        let Some(idx) = canonical.rfind('/') else { break };
        if idx < origin_len {
            break;
        }
        let last = &canonical[idx + 1..];
        let removable = last == bilingual
            || site
                .locale_suffixes
                .iter()
                .any(|s| s.eq_ignore_ascii_case(last));
        if !removable {
            break;
        }
        canonical.truncate(idx);
    }
    Ok(canonical)
}

/// Derive where an article lives on the site and on disk.
///
/// Pure: the same canonical URL and run date always give the same paths.
pub fn identify(
    link: &CandidateLink,
    site: &SiteProfile,
    output_root: &Path,
    run_date: NaiveDate,
) -> ArticleIdentity {
    let segments: Vec<String> = Url::parse(&link.canonical_url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
        })
        .unwrap_or_default();

    let url_date = segments.iter().find_map(|s| {
        (s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()))
            .then(|| NaiveDate::parse_from_str(s, "%Y%m%d").ok())
            .flatten()
    });
    let date = url_date.unwrap_or(run_date);
    let slug = segments.last().cloned().unwrap_or_else(|| "index".to_string());

    let folder = date.format("%Y%m%d").to_string();
    let storage_path = output_root
        .join(ARTICLES_DIR)
        .join(&folder)
        .join(format!("{}.html", slug));
    let meta_path = storage_path.with_extension("json");

    ArticleIdentity {
        bilingual_url: format!("{}/{}", link.canonical_url, site.bilingual_suffix),
        canonical_url: link.canonical_url.clone(),
        date,
        date_from_url: url_date.is_some(),
        relative_url: format!("{}/{}/{}.html", ARTICLES_DIR, folder, slug),
        slug,
        storage_path,
        meta_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::YearPolicy;
    use std::path::PathBuf;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn site() -> SiteProfile {
        SiteProfile::nytimes_cn()
    }

    #[test]
    fn test_only_dated_links_with_text_qualify() {
        let html = r#"
            <nav><a href="/world/">World</a><a href="/20250601/">  </a></nav>
            <a href="/world/20250601/some-slug/">标题示例</a>
            <a href="">empty</a>
        "#;
        let links = extract_links(html, &site(), run_date());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title_hint, "标题示例");
        assert_eq!(
            links[0].canonical_url,
            "https://cn.nytimes.com/world/20250601/some-slug"
        );
    }

    #[test]
    fn test_duplicate_href_keeps_first_title() {
        let html = r#"
            <a href="/world/20250601/some-slug/">第一个标题</a>
            <a href="/world/20250601/some-slug/">Second title</a>
        "#;
        let links = extract_links(html, &site(), run_date());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title_hint, "第一个标题");
    }

    #[test]
    fn test_dedup_by_canonical_url() {
        let html = r#"
            <a href="/world/20250601/some-slug/">标题</a>
            <a href="https://cn.nytimes.com/world/20250601/some-slug/zh-hant/?utm=home">標題</a>
            <a href="/business/20250602/other-slug/dual/">另一个</a>
        "#;
        let links = extract_links(html, &site(), run_date());
        let urls: Vec<&str> = links.iter().map(|l| l.canonical_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cn.nytimes.com/world/20250601/some-slug",
                "https://cn.nytimes.com/business/20250602/other-slug",
            ]
        );
    }

    #[test]
    fn test_malformed_domain_href_dropped() {
        let html = r#"<a href="cn.nytimes.com/world/20250601/some-slug/">标题</a>"#;
        assert!(extract_links(html, &site(), run_date()).is_empty());
    }

    #[test]
    fn test_excluded_year_never_extracted() {
        let mut site = site();
        site.year_policy = YearPolicy {
            excluded_years: vec![2022, 2023],
            max_age_days: None,
        };
        let html = r#"
            <a href="/2023/world/20230105/old-slug/">旧闻</a>
            <a href="/world/20220105/older-slug/">更旧</a>
            <a href="/world/20250601/fresh-slug/">新闻</a>
        "#;
        let links = extract_links(html, &site, run_date());
        assert_eq!(links.len(), 1);
        assert!(links[0].canonical_url.ends_with("fresh-slug"));
    }

    #[test]
    fn test_canonicalize_strips_suffixes() {
        let site = site();
        let cases = [
            ("/world/20250601/some-slug/", "https://cn.nytimes.com/world/20250601/some-slug"),
            ("/world/20250601/some-slug/zh-hant/", "https://cn.nytimes.com/world/20250601/some-slug"),
            ("/world/20250601/some-slug/zh-hant/dual/", "https://cn.nytimes.com/world/20250601/some-slug"),
            ("/world/20250601/some-slug?utm_source=x#top", "https://cn.nytimes.com/world/20250601/some-slug"),
            ("https://cn.nytimes.com/20250601/a/", "https://cn.nytimes.com/20250601/a"),
        ];
        for (href, expected) in cases {
            assert_eq!(canonicalize(href, &site).unwrap(), expected, "href {href}");
        }
    }

    #[test]
    fn test_identity_is_idempotent() {
        let site = site();
        let link = CandidateLink {
            href: "/world/20250601/some-slug/".into(),
            title_hint: "标题示例".into(),
            canonical_url: "https://cn.nytimes.com/world/20250601/some-slug".into(),
        };
        let root = PathBuf::from("/tmp/site");
        let a = identify(&link, &site, &root, run_date());
        let b = identify(&link, &site, &root, run_date());
        assert_eq!(a, b);
        assert_eq!(a.date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert!(a.date_from_url);
        assert_eq!(a.slug, "some-slug");
        assert_eq!(a.storage_path, root.join("articles/20250601/some-slug.html"));
        assert_eq!(a.meta_path, root.join("articles/20250601/some-slug.json"));
        assert_eq!(a.relative_url, "articles/20250601/some-slug.html");
        assert_eq!(
            a.bilingual_url,
            "https://cn.nytimes.com/world/20250601/some-slug/dual/"
        );
    }

    #[test]
    fn test_identity_falls_back_to_run_date() {
        let link = CandidateLink {
            href: "/opinion/99999999/odd-slug/".into(),
            title_hint: "观点".into(),
            canonical_url: "https://cn.nytimes.com/opinion/99999999/odd-slug".into(),
        };
        let id = identify(&link, &site(), Path::new("out"), run_date());
        assert_eq!(id.date, run_date());
        assert!(!id.date_from_url);
        assert_eq!(id.relative_url, "articles/20250615/odd-slug.html");
    }
}
