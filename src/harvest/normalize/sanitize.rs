//! Paragraph tagging and boilerplate stripping.
//!
//! The source tree is never mutated: the content container is walked once and
//! a new fragment is serialized, leaving out or unwrapping nodes on the way.
//! Running the transform over its own output yields the same output.
//!
//! Per node, in order:
//!
//! - `p` with text gets class `cn` (contains CJK) or `en`, unless it already
//!   carries one of them
//! - `a` is unwrapped (children kept)
//! - headings, `header`, `nav`, scripts, styles, and comments are dropped
//! - elements with a byline/timestamp/date/meta class are dropped
//! - the innermost element containing a boilerplate phrase is dropped when
//!   it is small; in larger ones only the phrase itself is removed
//!
//! Finally the first remaining top-level child is dropped when its text is
//! the foreign headline.

use crate::utils::{collapse_whitespace, has_cjk};
use ego_tree::NodeRef;
use html_escape::{encode_double_quoted_attribute, encode_text};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::node::Element;
use scraper::{ElementRef, Node};

/// Elements with less text than this are removed whole when they contain a
/// boilerplate phrase.
pub const SMALL_ELEMENT_CHARS: usize = 120;

pub const NATIVE_CLASS: &str = "cn";
pub const FOREIGN_CLASS: &str = "en";

const DROPPED_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "nav", "script", "style", "noscript",
];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

static NOISE_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)byline|timestamp|(^|[\s_-])(date|dateline|meta)([\s_-]|$)").unwrap()
});

/// What to strip beyond the fixed structural rules.
#[derive(Debug, Clone, Copy)]
pub struct StripRules<'a> {
    pub boilerplate: &'a [String],
    /// Resolved foreign headline; may be empty.
    pub foreign_title: &'a str,
}

/// Which language class, if any, a paragraph already carries.
pub fn language_tag(el: &Element) -> Option<&'static str> {
    el.classes().find_map(|c| match c {
        NATIVE_CLASS => Some(NATIVE_CLASS),
        FOREIGN_CLASS => Some(FOREIGN_CLASS),
        _ => None,
    })
}

/// Sanitize the children of `container` into a new fragment.
pub fn sanitize_container(container: ElementRef<'_>, rules: StripRules<'_>) -> String {
    render_top_level(*container, rules)
}

fn render_top_level(parent: NodeRef<'_, Node>, rules: StripRules<'_>) -> String {
    // (markup, text, is_element) per child
    let mut parts: Vec<(String, String, bool)> = Vec::new();
    for child in parent.children() {
        let mut html = String::new();
        let mut text = String::new();
        render_node(child, &mut html, &mut text, rules);
        parts.push((html, text, child.value().is_element()));
    }

    let title = collapse_whitespace(rules.foreign_title);
    if !title.is_empty() {
        if let Some(first) = parts
            .iter()
            .position(|(html, _, is_element)| *is_element && !html.is_empty())
        {
            if collapse_whitespace(&parts[first].1) == title {
                parts.remove(first);
            }
        }
    }

    parts.into_iter().map(|(html, _, _)| html).collect()
}

fn contains_boilerplate(text: &str, rules: StripRules<'_>) -> bool {
    rules.boilerplate.iter().any(|p| !p.is_empty() && text.contains(p.as_str()))
}

/// Whether some child element carries a boilerplate phrase on its own, in
/// which case the phrase is removed at that deeper level instead.
fn child_holds_boilerplate(node: NodeRef<'_, Node>, rules: StripRules<'_>) -> bool {
    node.children()
        .filter_map(ElementRef::wrap)
        .any(|child| contains_boilerplate(&child.text().collect::<String>(), rules))
}

fn strip_boilerplate(text: &str, rules: StripRules<'_>) -> String {
    rules
        .boilerplate
        .iter()
        .filter(|p| !p.is_empty())
        .fold(text.to_string(), |acc, phrase| acc.replace(phrase.as_str(), ""))
}

fn render_node(node: NodeRef<'_, Node>, html: &mut String, text: &mut String, rules: StripRules<'_>) {
    match node.value() {
        Node::Text(t) => {
            let stripped = strip_boilerplate(t, rules);
            html.push_str(&encode_text(&stripped));
            text.push_str(&stripped);
        }
        Node::Element(el) => render_element(node, el, html, text, rules),
        Node::Document | Node::Fragment => {
            for child in node.children() {
                render_node(child, html, text, rules);
            }
        }
        _ => {}
    }
}

fn render_element(
    node: NodeRef<'_, Node>,
    el: &Element,
    html: &mut String,
    text: &mut String,
    rules: StripRules<'_>,
) {
    let name = el.name();
    if DROPPED_TAGS.contains(&name) {
        return;
    }
    if el.attr("class").is_some_and(|c| NOISE_CLASS.is_match(c)) {
        return;
    }

    let own_text: String = ElementRef::wrap(node)
        .map(|e| e.text().collect())
        .unwrap_or_default();
    if contains_boilerplate(&own_text, rules)
        && own_text.trim().chars().count() < SMALL_ELEMENT_CHARS
        && !child_holds_boilerplate(node, rules)
    {
        return;
    }

    if name == "a" {
        for child in node.children() {
            render_node(child, html, text, rules);
        }
        return;
    }

    let added_class = (name == "p" && !own_text.trim().is_empty() && language_tag(el).is_none())
        .then(|| if has_cjk(&own_text) { NATIVE_CLASS } else { FOREIGN_CLASS });

    let mut attrs: Vec<(String, String)> = el
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    if let Some(class) = added_class {
        match attrs.iter_mut().find(|(k, _)| k == "class") {
            Some((_, v)) if !v.trim().is_empty() => {
                v.push(' ');
                v.push_str(class);
            }
            Some((_, v)) => *v = class.to_string(),
            None => attrs.push(("class".to_string(), class.to_string())),
        }
    }
    attrs.sort();

    html.push('<');
    html.push_str(name);
    for (k, v) in &attrs {
        html.push(' ');
        html.push_str(k);
        html.push_str("=\"");
        html.push_str(&encode_double_quoted_attribute(v));
        html.push('"');
    }
    html.push('>');

    if VOID_TAGS.contains(&name) {
        return;
    }
    for child in node.children() {
        render_node(child, html, text, rules);
    }
    html.push_str("</");
    html.push_str(name);
    html.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn sanitize_fragment(fragment: &str, rules: StripRules<'_>) -> String {
        let parsed = Html::parse_fragment(fragment);
        render_top_level(*parsed.root_element(), rules)
    }

    fn phrases() -> Vec<String> {
        crate::config::BOILERPLATE_PHRASES
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn run(html: &str, foreign_title: &str) -> String {
        let phrases = phrases();
        let rules = StripRules {
            boilerplate: &phrases,
            foreign_title,
        };
        let doc = Html::parse_document(html);
        let sel = Selector::parse("#body").unwrap();
        sanitize_container(doc.select(&sel).next().unwrap(), rules)
    }

    #[test]
    fn test_paragraphs_are_tagged_by_script() {
        let out = run(
            r#"<div id="body"><p>美联储再次降息。</p><p>The Fed cut rates again.</p><p>  </p></div>"#,
            "",
        );
        assert_eq!(
            out,
            r#"<p class="cn">美联储再次降息。</p><p class="en">The Fed cut rates again.</p><p>  </p>"#
        );
    }

    #[test]
    fn test_existing_tag_is_never_changed() {
        let out = run(
            r#"<div id="body"><p class="en">美联储</p><p class="lead cn">Fed</p><p class="lead">Fed</p></div>"#,
            "",
        );
        assert_eq!(
            out,
            r#"<p class="en">美联储</p><p class="lead cn">Fed</p><p class="lead en">Fed</p>"#
        );
    }

    #[test]
    fn test_links_unwrapped_and_headings_dropped() {
        let out = run(
            r#"<div id="body"><header><h1>标题</h1></header><h2>Sub</h2><p>见<a href="/x">此处</a>。</p></div>"#,
            "",
        );
        assert_eq!(out, r#"<p class="cn">见此处。</p>"#);
    }

    #[test]
    fn test_noise_classes_dropped() {
        let out = run(
            r#"<div id="body"><div class="byline-author">By Jane</div><time class="article-date">2025</time><div class="meta">x</div><div class="metadata-ok">keep</div></div>"#,
            "",
        );
        assert_eq!(out, r#"<div class="metadata-ok">keep</div>"#);
    }

    #[test]
    fn test_small_boilerplate_element_removed_whole() {
        let out = run(
            r#"<div id="body"><p>正文内容。</p><p>翻译：纽约时报中文网 点击查看本文英文版。</p></div>"#,
            "",
        );
        assert_eq!(out, r#"<p class="cn">正文内容。</p>"#);
    }

    #[test]
    fn test_credit_beside_body_paragraphs_drops_only_the_credit() {
        let out = run(
            r#"<div id="body"><div class="article-paragraph"><p>美联储周三宣布降息，这是今年第二次。</p><p>The Fed cut rates again on Wednesday.</p><p>点击查看本文英文版。</p></div></div>"#,
            "",
        );
        assert_eq!(
            out,
            r#"<div class="article-paragraph"><p class="cn">美联储周三宣布降息，这是今年第二次。</p><p class="en">The Fed cut rates again on Wednesday.</p></div>"#
        );
    }

    #[test]
    fn test_full_width_punctuation_keeps_english_tag() {
        let out = run(r#"<div id="body"><p>The Fed said, “rates fall”，again.</p></div>"#, "");
        assert_eq!(out, r#"<p class="en">The Fed said, “rates fall”，again.</p>"#);
    }

    #[test]
    fn test_large_element_keeps_text_but_loses_phrase() {
        let long = "这是一个很长的段落。".repeat(20);
        let html = format!(r#"<div id="body"><p>{long}点击查看本文英文版。</p></div>"#);
        let out = run(&html, "");
        assert_eq!(out, format!(r#"<p class="cn">{long}</p>"#));
    }

    #[test]
    fn test_duplicate_foreign_heading_removed() {
        let out = run(
            r#"<div id="body">
<div class="en-title-dup">Why the Fed Cut Rates</div><p>正文。</p></div>"#,
            "Why the Fed Cut Rates",
        );
        assert_eq!(out, "\n<p class=\"cn\">正文。</p>");
    }

    #[test]
    fn test_stripping_is_idempotent() {
        let html = r#"<div id="body">
  <header class="article-header"><h1>标题</h1></header>
  <div class="article-paragraph">
    <p>美联储周三宣布<a href="/econ">降息</a>。</p>
    <p>The Federal Reserve cut rates on <b>Wednesday</b> &amp; signaled more.</p>
  </div>
  <p class="byline">By Jane Doe</p>
  <img src="/chart.png" alt="chart &quot;1&quot;">
  <p>點擊查看本文英文版。</p>
</div>"#;
        let phrases = phrases();
        let rules = StripRules {
            boilerplate: &phrases,
            foreign_title: "Fed Cuts Rates",
        };
        let once = run(html, "Fed Cuts Rates");
        let twice = sanitize_fragment(&once, rules);
        let thrice = sanitize_fragment(&twice, rules);
        assert_eq!(once, twice);
        assert_eq!(twice, thrice);
        assert!(once.contains(r#"<p class="cn">美联储周三宣布降息。</p>"#));
        assert!(once.contains("&amp; signaled"));
        assert!(!once.contains("Jane"));
    }
}
