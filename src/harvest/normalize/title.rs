//! Bilingual headline extractors.
//!
//! Each extractor is a plain function over [`ExtractContext`]; the lists
//! below are evaluated in order and the first hit wins.

use super::{ExtractContext, Extractor, jsonld};
use crate::utils::{collapse_whitespace, has_cjk, is_latin_only};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

pub const FOREIGN_TITLE_CLASSES: &[&str] = &["en-title", "en-headline"];

static EN_TITLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1.en-title, h2.en-title, h3.en-title, h4.en-title").unwrap()
});
static EN_HEADLINE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1.en-headline, h2.en-headline, h3.en-headline, h4.en-headline").unwrap()
});
static HEADINGS: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3").unwrap());
static TITLE_DELIMITER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+[-–—|]\s+|\s*[–—|]\s*").unwrap());

/// Foreign-language headline cascade.
pub const FOREIGN_TITLE_EXTRACTORS: &[(&str, Extractor)] = &[
    ("en-title heading", foreign_title_heading),
    ("en-headline heading", foreign_headline_heading),
    ("linked-data alternativeHeadline", alternative_headline),
    ("document title segment", document_title_segment),
];

/// Native-language headline cascade.
pub const NATIVE_TITLE_EXTRACTORS: &[(&str, Extractor)] = &[
    ("container heading", container_native_heading),
    ("document heading", document_native_heading),
];

fn heading_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn is_foreign_heading(el: &ElementRef<'_>) -> bool {
    el.value()
        .classes()
        .any(|c| FOREIGN_TITLE_CLASSES.contains(&c))
}

pub fn foreign_title_heading(ctx: &ExtractContext<'_>) -> Option<String> {
    ctx.document
        .select(&EN_TITLE)
        .map(heading_text)
        .find(|t| !t.is_empty())
}

pub fn foreign_headline_heading(ctx: &ExtractContext<'_>) -> Option<String> {
    ctx.document
        .select(&EN_HEADLINE)
        .map(heading_text)
        .find(|t| !t.is_empty())
}

pub fn alternative_headline(ctx: &ExtractContext<'_>) -> Option<String> {
    jsonld::string_field(ctx.linked_data, "alternativeHeadline")
        .map(|t| collapse_whitespace(&t))
        .filter(|t| !ctx.is_brand(t))
}

/// First Latin-only, non-brand segment of the document title split on dashes.
pub fn document_title_segment(ctx: &ExtractContext<'_>) -> Option<String> {
    TITLE_DELIMITER
        .split(ctx.page_title)
        .map(collapse_whitespace)
        .find(|segment| is_latin_only(segment) && !ctx.is_brand(segment))
}

fn native_heading<'a>(mut headings: impl Iterator<Item = ElementRef<'a>>) -> Option<String> {
    headings.find_map(|h| {
        if is_foreign_heading(&h) {
            return None;
        }
        let text = heading_text(h);
        has_cjk(&text).then_some(text)
    })
}

pub fn container_native_heading(ctx: &ExtractContext<'_>) -> Option<String> {
    native_heading(ctx.container.select(&HEADINGS))
}

pub fn document_native_heading(ctx: &ExtractContext<'_>) -> Option<String> {
    native_heading(ctx.document.select(&HEADINGS))
}
