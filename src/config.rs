//! Run configuration.
//!
//! Everything the pipeline needs is resolved once at start into a
//! [`HarvestConfig`] and passed down explicitly. Nothing below `main` reads
//! the environment or the command line.
//!
//! # Sources
//!
//! 1. Built-in defaults (tuned for `cn.nytimes.com`)
//! 2. An optional YAML file (`--config`), see [`FileConfig`]
//! 3. Command-line flags and their environment variables
//!
//! Later sources override earlier ones.

use crate::cli::Cli;
use crate::errors::{HarvestError, Result};
use chrono::{Local, NaiveDate};
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://cn.nytimes.com";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_AUTHOR: &str = "The New York Times";
pub const DEFAULT_POLITENESS_DELAY_MS: u64 = 1_000;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 5_000;

/// Literal phrases that only appear on a "not found" page.
pub const NOT_FOUND_MARKERS: &[&str] = &[
    "Page Not Found",
    "页面未找到",
    "頁面未找到",
    "抱歉，您访问的页面不存在",
    "抱歉，您訪問的頁面不存在",
];

/// Translation credits and "read the English version" links the site inserts
/// into article bodies.
pub const BOILERPLATE_PHRASES: &[&str] = &[
    "点击查看本文英文版。",
    "點擊查看本文英文版。",
    "点击查看本文英文版",
    "點擊查看本文英文版",
    "Click here to read the English version.",
    "Read in English",
    "翻译：纽约时报中文网",
    "翻譯：紐約時報中文網",
];

pub const BRAND_NAMES: &[&str] = &[
    "The New York Times",
    "New York Times",
    "NYTimes",
    "纽约时报中文网",
    "紐約時報中文網",
    "纽约时报",
    "紐約時報",
];

/// How the catalog index is paginated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// One static file per page with prev/next links.
    Paged,
    /// One file embedding the whole catalog, paginated in the browser.
    Embedded,
}

/// Which [`crate::fetchers::PageFetcher`] implementation loads a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    Http,
    Browser,
}

impl FetcherKind {
    /// The homepage builds its link list with JavaScript, so a browser is
    /// used whenever the build has one.
    pub fn default_homepage() -> Self {
        if cfg!(feature = "browser") {
            Self::Browser
        } else {
            Self::Http
        }
    }

    /// Bilingual article pages are static; plain HTTP also reports 404s.
    pub fn default_article() -> Self {
        Self::Http
    }
}

/// Which homepage links are too old to harvest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearPolicy {
    /// Years skipped outright, whether they appear as a `/2023/` segment or as
    /// the prefix of a `/20230601/` segment.
    pub excluded_years: Vec<i32>,
    /// Skip dated links older than this many days before the run date.
    pub max_age_days: Option<i64>,
}

impl YearPolicy {
    /// Whether `path` names an excluded year or a date older than the cut-off.
    pub fn excludes(&self, path: &str, run_date: NaiveDate) -> bool {
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !segment.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            match segment.len() {
                4 => {
                    if let Ok(year) = segment.parse::<i32>() {
                        if self.excluded_years.contains(&year) {
                            return true;
                        }
                    }
                }
                8 => {
                    if let Ok(year) = segment[..4].parse::<i32>() {
                        if self.excluded_years.contains(&year) {
                            return true;
                        }
                    }
                    if let (Some(max_age), Ok(date)) = (
                        self.max_age_days,
                        NaiveDate::parse_from_str(segment, "%Y%m%d"),
                    ) {
                        if (run_date - date).num_days() > max_age {
                            return true;
                        }
                    }
                }
                _ => {}
            }
        }
        false
    }
}

/// Site-specific markup conventions and identity rules.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub base_url: Url,
    pub homepage_url: Url,
    /// Host of `base_url`, used to spot malformed same-site hrefs.
    pub domain: String,
    /// Trailing path segments naming a locale variant of an article.
    pub locale_suffixes: Vec<String>,
    /// Appended to the canonical URL to reach the side-by-side edition.
    pub bilingual_suffix: String,
    pub brand_names: Vec<String>,
    /// How many extra letters a title may carry and still count as a bare brand name.
    pub brand_slack: usize,
    pub default_author: String,
    pub not_found_markers: Vec<String>,
    pub boilerplate_phrases: Vec<String>,
    pub year_policy: YearPolicy,
}

impl SiteProfile {
    pub fn new(base_url: Url) -> Self {
        let domain = base_url.host_str().unwrap_or_default().to_string();
        Self {
            homepage_url: base_url.clone(),
            base_url,
            domain,
            locale_suffixes: vec!["zh-hant".into(), "zh-hans".into(), "zh".into()],
            bilingual_suffix: "dual/".into(),
            brand_names: BRAND_NAMES.iter().map(|s| s.to_string()).collect(),
            brand_slack: 3,
            default_author: DEFAULT_AUTHOR.into(),
            not_found_markers: NOT_FOUND_MARKERS.iter().map(|s| s.to_string()).collect(),
            boilerplate_phrases: BOILERPLATE_PHRASES.iter().map(|s| s.to_string()).collect(),
            year_policy: YearPolicy::default(),
        }
    }

    /// Profile for the default site, used by tests and as the base for resolution.
    pub fn nytimes_cn() -> Self {
        Self::new(Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"))
    }

    /// First not-found marker present in `text`.
    pub fn not_found_marker<'a>(&'a self, text: &str) -> Option<&'a str> {
        self.not_found_markers
            .iter()
            .map(String::as_str)
            .find(|m| text.contains(m))
    }
}

/// Everything a run needs, resolved once.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub output_root: PathBuf,
    pub template_path: Option<PathBuf>,
    pub page_size: usize,
    pub index_mode: IndexMode,
    pub force_refetch: bool,
    pub include_archive: bool,
    pub homepage_fetcher: FetcherKind,
    pub article_fetcher: FetcherKind,
    pub politeness_delay: Duration,
    pub settle_delay: Duration,
    /// Fallback date for links without a date segment.
    pub run_date: NaiveDate,
    pub site: SiteProfile,
}

impl HarvestConfig {
    /// Defaults rooted at `output_root`, dated `run_date`, with no delays.
    pub fn new(output_root: impl Into<PathBuf>, run_date: NaiveDate) -> Self {
        Self {
            output_root: output_root.into(),
            template_path: None,
            page_size: DEFAULT_PAGE_SIZE,
            index_mode: IndexMode::Paged,
            force_refetch: false,
            include_archive: true,
            homepage_fetcher: FetcherKind::default_homepage(),
            article_fetcher: FetcherKind::default_article(),
            politeness_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            run_date,
            site: SiteProfile::nytimes_cn(),
        }
    }

    /// Merge defaults, the optional YAML file, and the command line.
    #[instrument(level = "info", skip_all)]
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(Path::new(path))?,
            None => FileConfig::default(),
        };
        let run_date = Local::now().date_naive();

        let base_url = cli
            .base_url
            .clone()
            .or(file.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut site = SiteProfile::new(Url::parse(&base_url)?);
        if let Some(homepage) = cli.homepage_url.clone().or(file.homepage_url.clone()) {
            site.homepage_url = Url::parse(&homepage)?;
        }
        if let Some(author) = file.default_author.clone() {
            site.default_author = author;
        }
        if let Some(slack) = file.brand_slack {
            site.brand_slack = slack;
        }
        if let Some(brands) = file.brand_names.clone() {
            site.brand_names = brands;
        }
        if let Some(suffixes) = file.locale_suffixes.clone() {
            site.locale_suffixes = suffixes;
        }
        if let Some(suffix) = file.bilingual_suffix.clone() {
            site.bilingual_suffix = suffix;
        }
        site.year_policy = YearPolicy {
            excluded_years: if cli.exclude_years.is_empty() {
                file.exclude_years.clone().unwrap_or_default()
            } else {
                cli.exclude_years.clone()
            },
            max_age_days: cli.max_age_days.or(file.max_age_days),
        };

        let page_size = cli
            .page_size
            .or(file.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(HarvestError::Config("page size must be at least 1".into()));
        }

        let config = Self {
            output_root: PathBuf::from(
                cli.output_dir
                    .clone()
                    .or(file.output_dir.clone())
                    .unwrap_or_else(|| ".".to_string()),
            ),
            template_path: cli
                .template
                .clone()
                .or(file.template.clone())
                .map(PathBuf::from),
            page_size,
            index_mode: cli
                .index_mode
                .or(file.index_mode)
                .unwrap_or(IndexMode::Paged),
            force_refetch: cli.force || file.force.unwrap_or(false),
            include_archive: !cli.no_archive && file.include_archive.unwrap_or(true),
            homepage_fetcher: cli
                .homepage_fetcher
                .or(file.homepage_fetcher)
                .unwrap_or_else(FetcherKind::default_homepage),
            article_fetcher: cli
                .article_fetcher
                .or(file.article_fetcher)
                .unwrap_or_else(FetcherKind::default_article),
            politeness_delay: Duration::from_millis(
                cli.delay_ms
                    .or(file.delay_ms)
                    .unwrap_or(DEFAULT_POLITENESS_DELAY_MS),
            ),
            settle_delay: Duration::from_millis(
                file.settle_delay_ms.unwrap_or(DEFAULT_SETTLE_DELAY_MS),
            ),
            run_date,
            site,
        };

        info!(
            output_root = %config.output_root.display(),
            base_url = %config.site.base_url,
            force = config.force_refetch,
            index_mode = ?config.index_mode,
            homepage_fetcher = ?config.homepage_fetcher,
            article_fetcher = ?config.article_fetcher,
            "Resolved configuration"
        );
        Ok(config)
    }
}

/// Shape of the optional YAML config file. Every key is optional.
///
/// ```yaml
/// output_dir: ./site
/// base_url: https://cn.nytimes.com
/// exclude_years: [2022, 2023]
/// max_age_days: 365
/// index_mode: embedded
/// page_size: 20
/// homepage_fetcher: browser
/// article_fetcher: http
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub output_dir: Option<String>,
    pub template: Option<String>,
    pub force: Option<bool>,
    pub base_url: Option<String>,
    pub homepage_url: Option<String>,
    pub exclude_years: Option<Vec<i32>>,
    pub max_age_days: Option<i64>,
    pub page_size: Option<usize>,
    pub index_mode: Option<IndexMode>,
    pub homepage_fetcher: Option<FetcherKind>,
    pub article_fetcher: Option<FetcherKind>,
    pub include_archive: Option<bool>,
    pub delay_ms: Option<u64>,
    pub settle_delay_ms: Option<u64>,
    pub default_author: Option<String>,
    pub brand_names: Option<Vec<String>>,
    pub brand_slack: Option<usize>,
    pub locale_suffixes: Option<Vec<String>>,
    pub bilingual_suffix: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            HarvestError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let parsed: FileConfig = serde_yaml::from_str(&text)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(parsed)
    }
}
