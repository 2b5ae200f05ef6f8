//! Browsable index pages over the catalog.
//!
//! # Modes
//!
//! - **Paged**: `index.html` is page 1, later pages are `page-2.html`,
//!   `page-3.html`, ... linked with prev/next. Page files left over from a
//!   larger earlier catalog are removed.
//! - **Embedded**: a single `index.html` carrying the whole catalog as JSON,
//!   paginated client-side.
//!
//! An empty catalog still produces an `index.html` with a placeholder.

use crate::config::IndexMode;
use crate::errors::Result;
use crate::models::CatalogEntry;
use crate::utils::write_atomic;
use chrono::NaiveDate;
use html_escape::{encode_double_quoted_attribute, encode_text};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

pub const INDEX_FILE: &str = "index.html";

static PAGE_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^page-(\d+)\.html$").unwrap());

const STYLE: &str = r#"<style>
  body { font-family: Georgia, "Songti SC", serif; margin: 2em auto; max-width: 760px; padding: 0 1em; color: #222; }
  h1 { text-align: center; }
  .updated { text-align: center; color: #888; font-size: 0.9em; }
  ul.articles { list-style: none; padding: 0; }
  ul.articles li { border-bottom: 1px solid #eee; padding: 0.8em 0; }
  .cn { display: block; font-size: 1.1em; color: #00589c; }
  .en { display: block; color: #333; }
  .meta { color: #888; font-size: 0.85em; }
  nav.pager { display: flex; justify-content: space-between; margin-top: 1.5em; }
  .empty { text-align: center; color: #888; margin-top: 3em; }
</style>"#;

/// File name of 1-based page `n`.
pub fn page_file(n: usize) -> String {
    if n <= 1 {
        INDEX_FILE.to_string()
    } else {
        format!("page-{}.html", n)
    }
}

fn page_shell(body: &str, run_date: NaiveDate) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"zh\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>双语新闻 Bilingual News</title>\n{}\n</head>\n<body>\n\
         <h1>双语新闻 Bilingual News</h1>\n<p class=\"updated\">Updated {}</p>\n{}</body>\n</html>\n",
        STYLE,
        run_date.format("%Y-%m-%d"),
        body
    )
}

fn entry_item(entry: &CatalogEntry) -> String {
    let foreign = if entry.title_foreign.is_empty() {
        String::new()
    } else {
        format!("<span class=\"en\">{}</span>", encode_text(&entry.title_foreign))
    };
    format!(
        "<li><a href=\"{}\"><span class=\"cn\">{}</span>{}</a><span class=\"meta\">{} · {}</span></li>\n",
        encode_double_quoted_attribute(&entry.url),
        encode_text(&entry.title_native),
        foreign,
        entry.date.format("%Y-%m-%d"),
        encode_text(&entry.author),
    )
}

fn render_empty(run_date: NaiveDate) -> String {
    page_shell("<p class=\"empty\">暂无文章 No articles yet.</p>\n", run_date)
}

/// Render every page of the paged index as `(file name, markup)`.
pub fn render_paged(
    entries: &[CatalogEntry],
    page_size: usize,
    run_date: NaiveDate,
) -> Vec<(String, String)> {
    if entries.is_empty() {
        return vec![(INDEX_FILE.to_string(), render_empty(run_date))];
    }
    let page_size = page_size.max(1);
    let pages: Vec<&[CatalogEntry]> = entries.chunks(page_size).collect();
    let total = pages.len();

    pages
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let n = i + 1;
            let mut body = String::from("<ul class=\"articles\">\n");
            for entry in chunk {
                body.push_str(&entry_item(entry));
            }
            body.push_str("</ul>\n<nav class=\"pager\">");
            if n > 1 {
                body.push_str(&format!("<a class=\"prev\" href=\"{}\">← 上一页 Prev</a>", page_file(n - 1)));
            } else {
                body.push_str("<span></span>");
            }
            body.push_str(&format!("<span class=\"count\">{} / {}</span>", n, total));
            if n < total {
                body.push_str(&format!("<a class=\"next\" href=\"{}\">下一页 Next →</a>", page_file(n + 1)));
            } else {
                body.push_str("<span></span>");
            }
            body.push_str("</nav>\n");
            (page_file(n), page_shell(&body, run_date))
        })
        .collect()
}

const EMBEDDED_SCRIPT: &str = r#"<script>
(function () {
  var data = JSON.parse(document.getElementById("catalog").textContent);
  var size = parseInt(document.getElementById("catalog").dataset.pageSize, 10) || 10;
  var pages = Math.max(1, Math.ceil(data.length / size));
  var list = document.getElementById("articles");
  var count = document.getElementById("count");
  var page = 1;
  function text(tag, cls, value) {
    var el = document.createElement(tag);
    el.className = cls;
    el.textContent = value;
    return el;
  }
  function show(n) {
    page = Math.min(Math.max(1, n), pages);
    list.innerHTML = "";
    data.slice((page - 1) * size, page * size).forEach(function (e) {
      var li = document.createElement("li");
      var a = document.createElement("a");
      a.href = e.url;
      a.appendChild(text("span", "cn", e.title_native));
      if (e.title_foreign) a.appendChild(text("span", "en", e.title_foreign));
      li.appendChild(a);
      li.appendChild(text("span", "meta", e.date + " · " + e.author));
      list.appendChild(li);
    });
    count.textContent = page + " / " + pages;
  }
  document.getElementById("prev").onclick = function () { show(page - 1); return false; };
  document.getElementById("next").onclick = function () { show(page + 1); return false; };
  show(1);
})();
</script>
"#;

/// Render the single-page index with the catalog embedded as JSON.
pub fn render_embedded(
    entries: &[CatalogEntry],
    page_size: usize,
    run_date: NaiveDate,
) -> Result<String> {
    if entries.is_empty() {
        return Ok(render_empty(run_date));
    }
    // `</` would close the script element early.
    let json = serde_json::to_string(entries)?.replace("</", "<\\/");
    let body = format!(
        "<ul class=\"articles\" id=\"articles\"></ul>\n\
         <nav class=\"pager\"><a id=\"prev\" href=\"#\">← 上一页 Prev</a>\
         <span id=\"count\"></span><a id=\"next\" href=\"#\">下一页 Next →</a></nav>\n\
         <script type=\"application/json\" id=\"catalog\" data-page-size=\"{}\">{}</script>\n{}",
        page_size.max(1),
        json,
        EMBEDDED_SCRIPT
    );
    Ok(page_shell(&body, run_date))
}

/// Remove `page-N.html` files with `N > keep`.
async fn remove_surplus_pages(output_root: &Path, keep: usize) -> Result<()> {
    let mut dir = match fs::read_dir(output_root).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(n) = PAGE_FILE
            .captures(&name)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<usize>().ok())
        else {
            continue;
        };
        if n > keep {
            debug!(file = %name, "Removing stale index page");
            fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

/// Render the index in `mode` and write it under `output_root`.
///
/// Returns the paths written.
#[instrument(level = "info", skip(entries), fields(root = %output_root.display(), count = entries.len()))]
pub async fn write_index(
    entries: &[CatalogEntry],
    output_root: &Path,
    mode: IndexMode,
    page_size: usize,
    run_date: NaiveDate,
) -> Result<Vec<PathBuf>> {
    let pages = match mode {
        IndexMode::Paged => render_paged(entries, page_size, run_date),
        IndexMode::Embedded => vec![(
            INDEX_FILE.to_string(),
            render_embedded(entries, page_size, run_date)?,
        )],
    };

    let mut written = Vec::with_capacity(pages.len());
    for (name, markup) in &pages {
        let path = output_root.join(name);
        write_atomic(&path, markup.as_bytes()).await?;
        written.push(path);
    }
    remove_surplus_pages(output_root, pages.len()).await?;

    info!(pages = written.len(), ?mode, "Wrote index");
    Ok(written)
}
