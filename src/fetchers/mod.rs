//! Page fetchers: the collaborators that turn a URL into rendered markup.
//!
//! The pipeline only sees the [`PageFetcher`] trait, so it runs the same
//! against a real site or an in-memory fake. The homepage and the article
//! pages each get their own fetcher: the homepage needs JavaScript, while
//! the bilingual pages are static and a plain GET can report a 404.
//!
//! | Fetcher | Module | Notes |
//! |---------|--------|-------|
//! | Plain HTTP | [`http`] | `reqwest`, browser-like User-Agent, no JavaScript |
//! | Headless Chrome | [`browser`] | `chromiumoxide`, needs the `browser` feature |

#[cfg(feature = "browser")]
pub mod browser;
pub mod http;

use crate::config::{FetcherKind, HarvestConfig};
use crate::errors::{HarvestError, Result};
use crate::models::FetchedPage;
use scraper::{Html, Selector};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Something that can load a page and hand back its rendered markup.
pub trait PageFetcher {
    /// Navigate to `url` and return the final markup and document title.
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;

    /// Release any held resources (browser processes, sessions).
    async fn close(&self) {}
}

/// A fetcher chosen at start-up.
pub enum AnyFetcher {
    Http(http::HttpFetcher),
    #[cfg(feature = "browser")]
    Browser(browser::BrowserFetcher),
}

impl AnyFetcher {
    /// Build the fetcher of `kind`, taking its settings from `config`.
    pub async fn from_kind(kind: FetcherKind, config: &HarvestConfig) -> Result<Self> {
        match kind {
            FetcherKind::Http => Ok(Self::Http(http::HttpFetcher::new()?)),
            #[cfg(feature = "browser")]
            FetcherKind::Browser => Ok(Self::Browser(
                browser::BrowserFetcher::launch(config.settle_delay).await?,
            )),
            #[cfg(not(feature = "browser"))]
            FetcherKind::Browser => Err(HarvestError::Config(
                "the browser fetcher needs a build with `--features browser`".into(),
            )),
        }
    }
}

impl PageFetcher for AnyFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        match self {
            Self::Http(f) => f.fetch(url).await,
            #[cfg(feature = "browser")]
            Self::Browser(f) => f.fetch(url).await,
        }
    }

    async fn close(&self) {
        match self {
            Self::Http(f) => f.close().await,
            #[cfg(feature = "browser")]
            Self::Browser(f) => f.close().await,
        }
    }
}

/// Text of the document's `<title>`, whitespace-collapsed.
pub fn document_title(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|t| crate::utils::collapse_whitespace(&t.text().collect::<String>()))
        .unwrap_or_default()
}
