//! # Dual Harvest
//!
//! Harvests the bilingual (side-by-side Chinese/English) edition of a news
//! site into a local archive of self-contained HTML pages, and keeps a
//! browsable, paginated index over everything collected so far.
//!
//! ## Features
//!
//! - Finds dated article links on the homepage, deduplicated and filtered by
//!   a configurable year policy
//! - Skips articles already on disk unless their stored metadata is weak
//!   (missing or brand-name English headline, leftover translation credits)
//! - Extracts bilingual headlines, author and date through ordered heuristic
//!   cascades, and tags every paragraph `cn` or `en`
//! - Writes a JSON catalog plus a paged or embedded HTML index
//!
//! ## Usage
//!
//! ```sh
//! dual_harvest -o ./site
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: fetch the homepage and extract candidate links
//! 2. **Cache check**: decide per candidate whether to fetch
//! 3. **Normalization**: turn the bilingual page into an article record
//! 4. **Output**: store articles, rebuild the catalog and the index

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod errors;
mod fetchers;
mod harvest;
mod models;
mod outputs;
mod utils;

use cli::Cli;
use config::HarvestConfig;
use fetchers::{AnyFetcher, PageFetcher};
use outputs::article::ArticleTemplate;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("dual_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = HarvestConfig::resolve(&args)?;

    // Early check: the output root must be writable before anything is fetched
    if let Err(e) = ensure_writable_dir(&config.output_root).await {
        error!(
            path = %config.output_root.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let template = ArticleTemplate::load(config.template_path.as_deref()).await?;
    let homepage_fetcher = AnyFetcher::from_kind(config.homepage_fetcher, &config).await?;
    let article_fetcher = match AnyFetcher::from_kind(config.article_fetcher, &config).await {
        Ok(f) => f,
        Err(e) => {
            homepage_fetcher.close().await;
            return Err(e.into());
        }
    };

    let summary = harvest::run(&config, &homepage_fetcher, &article_fetcher, &template).await?;

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        new = summary.new,
        cached = summary.cached,
        refetched = summary.refetched,
        skipped = summary.skipped,
        catalog = summary.catalog_size,
        "Execution complete"
    );
    Ok(())
}
