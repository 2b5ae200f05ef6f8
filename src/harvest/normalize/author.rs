//! Author and publish-date extractors.

use super::{ExtractContext, Extractor, jsonld};
use crate::utils::collapse_whitespace;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::Selector;

static ADDRESS: Lazy<Selector> = Lazy::new(|| Selector::parse("address").unwrap());
static BYLINE_META: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="byl"], meta[name="author"]"#).unwrap());
static PUBLISHED_META: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="article:published_time"], meta[name="date"]"#).unwrap()
});

pub const AUTHOR_EXTRACTORS: &[(&str, Extractor)] = &[
    ("linked-data author", linked_data_author),
    ("address element", address_author),
    ("byline meta", meta_author),
];

/// Drop a leading "By " that bylines usually carry.
fn strip_by(byline: &str) -> String {
    let trimmed = collapse_whitespace(byline);
    match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("by ") => trimmed[3..].trim().to_string(),
        _ => trimmed,
    }
}

pub fn linked_data_author(ctx: &ExtractContext<'_>) -> Option<String> {
    ["author", "creator"].iter().find_map(|key| {
        ctx.linked_data
            .iter()
            .filter_map(|o| o.get(*key))
            .find_map(jsonld::names)
    })
}

pub fn address_author(ctx: &ExtractContext<'_>) -> Option<String> {
    ctx.document
        .select(&ADDRESS)
        .map(|a| strip_by(&a.text().collect::<String>()))
        .find(|a| !a.is_empty())
}

pub fn meta_author(ctx: &ExtractContext<'_>) -> Option<String> {
    ctx.document
        .select(&BYLINE_META)
        .filter_map(|m| m.value().attr("content"))
        .map(strip_by)
        .find(|a| !a.is_empty())
}

/// Publish date from linked data or meta tags, if the page states one.
pub fn published_date(ctx: &ExtractContext<'_>) -> Option<NaiveDate> {
    let from_ld = jsonld::string_field(ctx.linked_data, "datePublished");
    let from_meta = || {
        ctx.document
            .select(&PUBLISHED_META)
            .filter_map(|m| m.value().attr("content"))
            .map(str::to_string)
            .next()
    };
    from_ld
        .or_else(from_meta)
        .and_then(|raw| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}
