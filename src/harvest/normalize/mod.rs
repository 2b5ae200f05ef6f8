//! Article normalization: raw bilingual page in, [`ArticleRecord`] out.
//!
//! # Steps
//!
//! 1. Reject not-found pages by literal marker
//! 2. Locate the content container through a fixed selector cascade
//! 3. Resolve the foreign and native headlines, author, and date through
//!    ordered extractor lists (first hit wins)
//! 4. Tag paragraphs by language and strip boilerplate ([`sanitize`])
//!
//! Missing headlines or authors do not fail normalization. They are recorded
//! as [`DegradedField`]s so the next run treats the stored copy as stale.

pub mod author;
pub mod jsonld;
pub mod sanitize;
pub mod title;

use crate::config::SiteProfile;
use crate::errors::{HarvestError, Result};
use crate::models::{ArticleIdentity, ArticleRecord, ArticleStatus, DegradedField, FetchedPage};
use crate::utils::{collapse_whitespace, is_brand_name, truncate_for_log};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Content containers, most specific first.
pub const CONTENT_SELECTORS: &[&str] = &[
    ".article-content",
    r#"section[name="articleBody"]"#,
    ".article-body",
    "article",
    "main",
];

static CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTENT_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// What every extractor gets to look at.
pub struct ExtractContext<'a> {
    pub document: &'a Html,
    pub container: ElementRef<'a>,
    /// Browser/document title as reported by the fetcher.
    pub page_title: &'a str,
    pub linked_data: &'a [Value],
    pub site: &'a SiteProfile,
}

impl ExtractContext<'_> {
    pub fn is_brand(&self, title: &str) -> bool {
        is_brand_name(title, &self.site.brand_names, self.site.brand_slack)
    }
}

pub type Extractor = fn(&ExtractContext<'_>) -> Option<String>;

/// Run `extractors` in order and return the first non-empty result.
pub fn first_success(extractors: &[(&str, Extractor)], ctx: &ExtractContext<'_>) -> Option<String> {
    extractors.iter().find_map(|(name, extract)| {
        let value = extract(ctx).filter(|v| !v.trim().is_empty())?;
        debug!(extractor = %name, %value, "Extractor matched");
        Some(value)
    })
}

/// First container selector with non-empty text.
pub fn locate_container(document: &Html) -> Option<ElementRef<'_>> {
    CONTAINERS.iter().find_map(|selector| {
        document
            .select(selector)
            .find(|el| !el.text().collect::<String>().trim().is_empty())
    })
}

/// Turn a fetched bilingual page into an article record.
///
/// # Errors
///
/// - [`HarvestError::InvalidPage`] when a not-found marker appears in the page
///   or in the located container
/// - [`HarvestError::ContentNotFound`] when no container selector matches
#[instrument(level = "info", skip_all, fields(url = %page.url, slug = %identity.slug))]
pub fn normalize(
    page: &FetchedPage,
    identity: &ArticleIdentity,
    title_hint: &str,
    site: &SiteProfile,
    status: ArticleStatus,
) -> Result<ArticleRecord> {
    let invalid = |marker: &str| HarvestError::InvalidPage {
        url: page.url.clone(),
        marker: marker.to_string(),
    };

    if let Some(marker) = site
        .not_found_marker(&page.html)
        .or_else(|| site.not_found_marker(&page.title))
    {
        return Err(invalid(marker));
    }

    let document = Html::parse_document(&page.html);
    let Some(container) = locate_container(&document) else {
        debug!(preview = %truncate_for_log(&page.html, 300), "No content container");
        return Err(HarvestError::ContentNotFound {
            url: page.url.clone(),
        });
    };
    let container_text: String = container.text().collect();
    if let Some(marker) = site.not_found_marker(&container_text) {
        return Err(invalid(marker));
    }

    let linked_data = jsonld::linked_data(&document);
    let ctx = ExtractContext {
        document: &document,
        container,
        page_title: &page.title,
        linked_data: &linked_data,
        site,
    };

    let mut degraded = Vec::new();

    let title_foreign = first_success(title::FOREIGN_TITLE_EXTRACTORS, &ctx).unwrap_or_else(|| {
        degraded.push(DegradedField::TitleForeign);
        String::new()
    });

    let title_native = first_success(title::NATIVE_TITLE_EXTRACTORS, &ctx).unwrap_or_else(|| {
        degraded.push(DegradedField::TitleNative);
        collapse_whitespace(title_hint)
    });

    let author = first_success(author::AUTHOR_EXTRACTORS, &ctx).unwrap_or_else(|| {
        degraded.push(DegradedField::Author);
        site.default_author.clone()
    });

    let date = if identity.date_from_url {
        identity.date
    } else {
        author::published_date(&ctx).unwrap_or(identity.date)
    };

    let content_fragment = sanitize::sanitize_container(
        container,
        sanitize::StripRules {
            boilerplate: &site.boilerplate_phrases,
            foreign_title: &title_foreign,
        },
    );

    if !degraded.is_empty() {
        warn!(?degraded, title_hint, "Extraction degraded; record will be refetched next run");
    }
    info!(%title_native, %title_foreign, %author, %date, "Normalized article");

    Ok(ArticleRecord {
        title_native,
        title_foreign,
        author,
        date,
        content_fragment,
        source_url: page.url.clone(),
        status,
        degraded,
        relative_url: identity.relative_url.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::links::identify;
    use crate::models::CandidateLink;
    use chrono::NaiveDate;
    use std::path::Path;

    const ARTICLE: &str = r#"<!DOCTYPE html>
<html><head>
<title>美联储再次降息 - Why the Fed Cut Rates Again - 纽约时报中文网</title>
<script type="application/ld+json">{"@type":"NewsArticle","author":{"@type":"Person","name":"Jane Doe"}}</script>
</head><body>
<nav><a href="/">首页</a></nav>
<header class="article-header">
  <h1 class="cn-headline">美联储再次降息</h1>
  <h1 class="en-headline">Why the Fed Cut Rates Again</h1>
  <div class="byline">JANE DOE 2025年6月1日</div>
</header>
<section name="articleBody">
  <div class="article-paragraph">
    <p>美联储周三宣布<a href="/econ">降息</a>。</p>
    <p>The Federal Reserve cut rates on Wednesday.</p>
  </div>
  <p>点击查看本文英文版。</p>
</section>
</body></html>"#;

    fn identity() -> ArticleIdentity {
        let link = CandidateLink {
            href: "/business/20250601/fed-rates/".into(),
            title_hint: "美联储降息".into(),
            canonical_url: "https://cn.nytimes.com/business/20250601/fed-rates".into(),
        };
        identify(
            &link,
            &SiteProfile::nytimes_cn(),
            Path::new("out"),
            NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
        )
    }

    fn page(html: &str) -> FetchedPage {
        FetchedPage {
            url: "https://cn.nytimes.com/business/20250601/fed-rates/dual/".into(),
            html: html.to_string(),
            title: crate::fetchers::document_title(html),
        }
    }

    #[test]
    fn test_normalize_full_article() {
        let record = normalize(
            &page(ARTICLE),
            &identity(),
            "美联储降息",
            &SiteProfile::nytimes_cn(),
            ArticleStatus::New,
        )
        .unwrap();

        assert_eq!(record.title_foreign, "Why the Fed Cut Rates Again");
        assert_eq!(record.title_native, "美联储再次降息");
        assert_eq!(record.author, "Jane Doe");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(record.status, ArticleStatus::New);
        assert!(record.degraded.is_empty());
        assert!(record.content_fragment.contains(r#"<p class="cn">美联储周三宣布降息。</p>"#));
        assert!(record.content_fragment.contains(r#"<p class="en">The Federal Reserve cut rates on Wednesday.</p>"#));
        assert!(!record.content_fragment.contains("点击查看"));
        assert!(!record.content_fragment.contains("<a"));
    }

    #[test]
    fn test_native_title_found_outside_container() {
        // The headline sits in the page header, not in the body section.
        let record = normalize(
            &page(ARTICLE),
            &identity(),
            "提示",
            &SiteProfile::nytimes_cn(),
            ArticleStatus::StaleRefetched,
        )
        .unwrap();
        assert_eq!(record.title_native, "美联储再次降息");
        assert_eq!(record.status, ArticleStatus::StaleRefetched);
    }

    #[test]
    fn test_not_found_page_is_invalid() {
        let html = "<html><head><title>Page Not Found</title></head><body><article>Sorry</article></body></html>";
        let err = normalize(
            &page(html),
            &identity(),
            "x",
            &SiteProfile::nytimes_cn(),
            ArticleStatus::New,
        )
        .unwrap_err();
        assert!(matches!(err, HarvestError::InvalidPage { .. }));
    }

    #[test]
    fn test_missing_container() {
        let html = "<html><body><div class=\"promo\">广告</div></body></html>";
        let err = normalize(
            &page(html),
            &identity(),
            "x",
            &SiteProfile::nytimes_cn(),
            ArticleStatus::New,
        )
        .unwrap_err();
        assert!(matches!(err, HarvestError::ContentNotFound { .. }));
    }

    #[test]
    fn test_container_cascade_priority() {
        let html = r#"<html><body>
            <main><p>main text</p></main>
            <article><p>article text</p></article>
            <div class="article-body">   </div>
        </body></html>"#;
        let document = Html::parse_document(html);
        let container = locate_container(&document).unwrap();
        assert_eq!(container.value().name(), "article");
    }

    #[test]
    fn test_degraded_fields_fall_back() {
        let html = "<html><head><title>纽约时报中文网</title></head><body><article><p>只有正文。</p></article></body></html>";
        let record = normalize(
            &page(html),
            &identity(),
            "  首页 标题 ",
            &SiteProfile::nytimes_cn(),
            ArticleStatus::New,
        )
        .unwrap();
        assert_eq!(record.title_foreign, "");
        assert_eq!(record.title_native, "首页 标题");
        assert_eq!(record.author, "The New York Times");
        assert_eq!(
            record.degraded,
            vec![
                DegradedField::TitleForeign,
                DegradedField::TitleNative,
                DegradedField::Author
            ]
        );
    }
}
