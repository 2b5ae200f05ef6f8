//! Command-line interface definitions for dual_harvest.
//!
//! Every option can also come from an environment variable or from the YAML
//! file given with `--config`. Explicit flags win over the file, and the file
//! wins over built-in defaults (see [`crate::config::HarvestConfig::resolve`]).

use crate::config::{FetcherKind, IndexMode};
use clap::Parser;

/// Command-line arguments for the harvester.
///
/// # Examples
///
/// ```sh
/// # Harvest into ./site using the defaults for cn.nytimes.com
/// dual_harvest -o ./site
///
/// # Re-download everything and render a single client-side paginated index
/// dual_harvest -o ./site --force --index-mode embedded
///
/// # Read the homepage over plain HTTP even in a `--features browser` build
/// dual_harvest -o ./site --homepage-fetcher http
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output root; articles land in `<root>/articles/YYYYMMDD/`
    #[arg(short, long, env = "DUAL_HARVEST_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Article template file with `{{placeholder}}` slots
    #[arg(short, long, env = "DUAL_HARVEST_TEMPLATE")]
    pub template: Option<String>,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "DUAL_HARVEST_CONFIG")]
    pub config: Option<String>,

    /// Re-download articles even when a valid local copy exists
    #[arg(short, long, env = "DUAL_HARVEST_FORCE")]
    pub force: bool,

    /// Base URL of the news site
    #[arg(long, env = "DUAL_HARVEST_BASE_URL")]
    pub base_url: Option<String>,

    /// Homepage to scan for article links (defaults to the base URL)
    #[arg(long)]
    pub homepage_url: Option<String>,

    /// Years whose articles are skipped, comma separated
    #[arg(long, value_delimiter = ',')]
    pub exclude_years: Vec<i32>,

    /// Skip articles dated more than this many days before the run date
    #[arg(long)]
    pub max_age_days: Option<i64>,

    /// Records per index page
    #[arg(long)]
    pub page_size: Option<usize>,

    /// How the index is paginated
    #[arg(long, value_enum)]
    pub index_mode: Option<IndexMode>,

    /// Fetcher for the homepage (browser when built with `--features browser`)
    #[arg(long, value_enum)]
    pub homepage_fetcher: Option<FetcherKind>,

    /// Fetcher for the bilingual article pages
    #[arg(long, value_enum, alias = "fetcher")]
    pub article_fetcher: Option<FetcherKind>,

    /// Only catalog articles linked from today's homepage
    #[arg(long)]
    pub no_archive: bool,

    /// Pause after each article fetch, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,
}
