//! Article pages: template filling and on-disk storage.
//!
//! A template is plain HTML with `{{placeholder}}` slots. The recognised
//! placeholders are `cn_title`, `en_title`, `author`, `date`, `content` and
//! `url`. Every value except `content` is HTML-escaped before substitution;
//! `content` is already sanitized markup.
//!
//! The built-in template renders the native headline as
//! `<h1 class="cn-headline">` and the foreign one as `<h2 class="en-headline">`,
//! which is also what the cache checker looks for in stores without sidecars.

use crate::errors::{HarvestError, Result};
use crate::models::{ArticleIdentity, ArticleRecord};
use crate::utils::write_atomic;
use chrono::Utc;
use html_escape::{encode_double_quoted_attribute, encode_text};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

const BUILTIN_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="zh">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="author" content="{{author}}">
<title>{{cn_title}}</title>
<style>
  body { font-family: Georgia, "Songti SC", serif; line-height: 1.8; margin: 2em auto; max-width: 720px; padding: 0 1em; color: #222; }
  h1.cn-headline { text-align: center; margin-bottom: 0.2em; }
  h2.en-headline { text-align: center; font-weight: normal; color: #555; border-bottom: 1px solid #ccc; padding-bottom: 0.5em; margin-bottom: 0.5em; }
  .meta { text-align: center; color: #888; font-size: 0.9em; margin-bottom: 2em; }
  p.en { color: #333; }
  p.cn { color: #00589c; margin-bottom: 2em; }
  img { max-width: 100%; }
</style>
</head>
<body>
<h1 class="cn-headline">{{cn_title}}</h1>
<h2 class="en-headline">{{en_title}}</h2>
<div class="meta">{{author}} · <time datetime="{{date}}">{{date}}</time> · <a href="{{url}}">原文</a></div>
<article>
{{content}}
</article>
<p class="back"><a href="../../index.html">返回目录</a></p>
</body>
</html>
"#;

#[derive(Debug, Clone)]
pub struct ArticleTemplate {
    source: String,
}

impl ArticleTemplate {
    pub fn builtin() -> Self {
        Self {
            source: BUILTIN_TEMPLATE.to_string(),
        }
    }

    /// Parse a template, requiring at least a `{{content}}` slot.
    pub fn from_source(source: String) -> Result<Self> {
        if !source.contains("{{content}}") {
            return Err(HarvestError::Template(
                "template has no {{content}} placeholder".into(),
            ));
        }
        Ok(Self { source })
    }

    /// Load the template at `path`, or the built-in one when `path` is `None`.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("Using built-in article template");
            return Ok(Self::builtin());
        };
        let source = fs::read_to_string(path).await.map_err(|e| {
            HarvestError::Template(format!("cannot read {}: {}", path.display(), e))
        })?;
        let template = Self::from_source(source)?;
        info!(path = %path.display(), "Loaded article template");
        Ok(template)
    }

    /// Substitute `{{key}}` for each pair in one pass over the template.
    ///
    /// Substituted values are never rescanned; unknown placeholders are kept.
    pub fn fill(&self, values: &[(&str, &str)]) -> String {
        PLACEHOLDER
            .replace_all(&self.source, |caps: &Captures<'_>| {
                let key = &caps[1];
                values
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| (*v).to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Render a record, escaping everything but the content fragment.
    pub fn render(&self, record: &ArticleRecord) -> String {
        let date = record.date.format("%Y-%m-%d").to_string();
        let cn_title = encode_text(&record.title_native);
        let en_title = encode_text(&record.title_foreign);
        let author = encode_double_quoted_attribute(&record.author);
        let date = encode_text(&date);
        let url = encode_double_quoted_attribute(&record.source_url);
        self.fill(&[
            ("cn_title", cn_title.as_ref()),
            ("en_title", en_title.as_ref()),
            ("author", author.as_ref()),
            ("date", date.as_ref()),
            ("url", url.as_ref()),
            ("content", record.content_fragment.as_str()),
        ])
    }
}

/// Store the rendered article and its sidecar, each via write-then-rename.
#[instrument(level = "info", skip_all, fields(path = %identity.storage_path.display()))]
pub async fn write_article(
    identity: &ArticleIdentity,
    record: &ArticleRecord,
    template: &ArticleTemplate,
) -> Result<()> {
    let html = template.render(record);
    write_atomic(&identity.storage_path, html.as_bytes()).await?;
    write_sidecar(identity, record).await?;
    info!(bytes = html.len(), "Saved article");
    Ok(())
}

/// Write only the sidecar, e.g. to upgrade a store that predates sidecars.
pub async fn write_sidecar(identity: &ArticleIdentity, record: &ArticleRecord) -> Result<()> {
    let meta = record.to_meta(&identity.canonical_url, Utc::now());
    let json = serde_json::to_string_pretty(&meta)?;
    write_atomic(&identity.meta_path, json.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleStatus, DegradedField};
    use chrono::NaiveDate;

    fn record() -> ArticleRecord {
        ArticleRecord {
            title_native: "标题示例".into(),
            title_foreign: "Fed <Cuts> & Rates".into(),
            author: "Jane \"JD\" Doe".into(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            content_fragment: "<p class=\"cn\">正文</p>".into(),
            source_url: "https://cn.nytimes.com/world/20250601/some-slug/dual/".into(),
            status: ArticleStatus::New,
            degraded: vec![DegradedField::Author],
            relative_url: "articles/20250601/some-slug.html".into(),
        }
    }

    #[test]
    fn test_fill_replaces_every_occurrence() {
        let t = ArticleTemplate::from_source("{{date}}|{{content}}|{{date}}".into()).unwrap();
        assert_eq!(t.fill(&[("date", "2025-06-01"), ("content", "x")]), "2025-06-01|x|2025-06-01");
    }

    #[test]
    fn test_fill_does_not_expand_placeholders_inside_values() {
        let mut r = record();
        r.title_foreign = "A {{content}} B {{url}}".into();
        let html = ArticleTemplate::builtin().render(&r);
        assert!(html.contains(r#"<h2 class="en-headline">A {{content}} B {{url}}</h2>"#));
        assert_eq!(html.matches("<p class=\"cn\">正文</p>").count(), 1);

        let t = ArticleTemplate::from_source("{{content}} {{unknown}}".into()).unwrap();
        assert_eq!(t.fill(&[("content", "{{unknown}}")]), "{{unknown}} {{unknown}}");
    }

    #[test]
    fn test_template_requires_content_slot() {
        assert!(matches!(
            ArticleTemplate::from_source("<html>{{cn_title}}</html>".into()),
            Err(HarvestError::Template(_))
        ));
    }

    #[test]
    fn test_render_escapes_metadata_not_content() {
        let html = ArticleTemplate::builtin().render(&record());
        assert!(html.contains(r#"<h1 class="cn-headline">标题示例</h1>"#));
        assert!(html.contains(r#"<h2 class="en-headline">Fed &lt;Cuts&gt; &amp; Rates</h2>"#));
        assert!(html.contains(r#"content="Jane &quot;JD&quot; Doe""#));
        assert!(html.contains("<p class=\"cn\">正文</p>"));
        assert!(!html.contains("{{"));
    }

    #[tokio::test]
    async fn test_write_article_and_sidecar() {
        let root = std::env::temp_dir().join(format!("dual_harvest_article_{}", uuid::Uuid::new_v4()));
        let link = crate::models::CandidateLink {
            href: "/world/20250601/some-slug/".into(),
            title_hint: "标题示例".into(),
            canonical_url: "https://cn.nytimes.com/world/20250601/some-slug".into(),
        };
        let id = crate::harvest::links::identify(
            &link,
            &crate::config::SiteProfile::nytimes_cn(),
            &root,
            NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
        );
        write_article(&id, &record(), &ArticleTemplate::builtin()).await.unwrap();

        assert!(id.storage_path.exists());
        let meta = crate::harvest::cache::read_meta(&id.meta_path).await.unwrap();
        assert_eq!(meta.title_foreign, "Fed <Cuts> & Rates");
        assert_eq!(meta.canonical_url, "https://cn.nytimes.com/world/20250601/some-slug");
        assert_eq!(meta.degraded, vec![DegradedField::Author]);
        let _ = std::fs::remove_dir_all(&root);
    }
}
