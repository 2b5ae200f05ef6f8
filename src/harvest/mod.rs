//! The harvest pipeline.
//!
//! # Flow
//!
//! ```text
//! homepage ──► links::extract_links ──► for each candidate (discovery order):
//!                                         links::identify
//!                                         cache::check ──► SkipCached ─────────┐
//!                                              │ FetchNew / Refetch            │
//!                                              ▼                               │
//!                                         fetch bilingual page                 │
//!                                         normalize::normalize                 │
//!                                         outputs::article::write_article ─────┤
//!                                                                              ▼
//!                               cache::scan_archive ──► catalog ──► index pages
//! ```
//!
//! The homepage and the bilingual pages go through separate fetchers. Both
//! are closed on every exit path.
//!
//! Candidates are processed one at a time. A failing candidate is logged with
//! its URL and title hint and skipped; only a homepage failure or a fatal
//! error ends the run. A stale stored copy whose refetch fails is deleted,
//! so it neither stays in the catalog nor blocks the next attempt. Forced
//! refetches keep the old copy.

pub mod cache;
pub mod links;
pub mod normalize;

use crate::config::HarvestConfig;
use crate::errors::{HarvestError, Result};
use crate::fetchers::PageFetcher;
use crate::models::{ArticleIdentity, ArticleRecord, ArticleStatus, CandidateLink};
use crate::outputs::article::{self, ArticleTemplate};
use crate::outputs::{catalog, indexes};
use cache::{CacheDecision, StaleReason};
use tracing::{error, info, instrument, warn};

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub new: usize,
    pub cached: usize,
    pub refetched: usize,
    pub skipped: usize,
    /// Entries in the written catalog, archive included.
    pub catalog_size: usize,
}

impl RunSummary {
    fn record(&mut self, status: ArticleStatus) {
        match status {
            ArticleStatus::New => self.new += 1,
            ArticleStatus::Cached => self.cached += 1,
            ArticleStatus::StaleRefetched => self.refetched += 1,
        }
    }
}

/// Run one harvest and close both fetchers afterwards, whatever the outcome.
pub async fn run<H: PageFetcher, A: PageFetcher>(
    config: &HarvestConfig,
    homepage_fetcher: &H,
    article_fetcher: &A,
    template: &ArticleTemplate,
) -> Result<RunSummary> {
    let result = harvest(config, homepage_fetcher, article_fetcher, template).await;
    homepage_fetcher.close().await;
    article_fetcher.close().await;
    result
}

#[instrument(level = "info", skip_all, fields(root = %config.output_root.display(), run_date = %config.run_date))]
async fn harvest<H: PageFetcher, A: PageFetcher>(
    config: &HarvestConfig,
    homepage_fetcher: &H,
    article_fetcher: &A,
    template: &ArticleTemplate,
) -> Result<RunSummary> {
    let site = &config.site;
    let homepage_url = site.homepage_url.as_str();

    info!(url = %homepage_url, "Fetching homepage");
    let homepage = homepage_fetcher
        .fetch(homepage_url)
        .await
        .map_err(|e| HarvestError::HomepageFetchFailed {
            url: homepage_url.to_string(),
            reason: e.to_string(),
        })?;

    let links = links::extract_links(&homepage.html, site, config.run_date);
    let mut summary = RunSummary {
        discovered: links.len(),
        ..RunSummary::default()
    };

    let mut records: Vec<ArticleRecord> = Vec::with_capacity(links.len());
    for (i, link) in links.iter().enumerate() {
        match process_candidate(config, article_fetcher, template, link).await {
            Ok(record) => {
                info!(index = i, status = %record.status, url = %record.relative_url, "Candidate done");
                summary.record(record.status);
                records.push(record);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(
                    index = i,
                    url = %link.canonical_url,
                    title_hint = %link.title_hint,
                    error = %e,
                    "Skipping candidate"
                );
                summary.skipped += 1;
            }
        }
    }

    let archived = if config.include_archive {
        cache::scan_archive(&config.output_root).await?
    } else {
        Vec::new()
    };
    let entries = catalog::build_catalog(&records, archived);
    summary.catalog_size = entries.len();

    catalog::write_catalog(&config.output_root, &entries).await?;
    indexes::write_index(
        &entries,
        &config.output_root,
        config.index_mode,
        config.page_size,
        config.run_date,
    )
    .await?;

    info!(
        discovered = summary.discovered,
        new = summary.new,
        cached = summary.cached,
        refetched = summary.refetched,
        skipped = summary.skipped,
        catalog = summary.catalog_size,
        "Harvest complete"
    );
    Ok(summary)
}

/// Check the cache and, if needed, fetch, normalize and store one candidate.
#[instrument(level = "info", skip_all, fields(url = %link.canonical_url))]
async fn process_candidate<F: PageFetcher>(
    config: &HarvestConfig,
    fetcher: &F,
    template: &ArticleTemplate,
    link: &CandidateLink,
) -> Result<ArticleRecord> {
    let site = &config.site;
    let identity = links::identify(link, site, &config.output_root, config.run_date);

    let (status, stale) = match cache::check(&identity, &link.title_hint, config.force_refetch, site).await? {
        CacheDecision::SkipCached {
            record,
            from_sidecar,
        } => {
            if !from_sidecar {
                article::write_sidecar(&identity, &record).await?;
            }
            return Ok(record);
        }
        CacheDecision::FetchNew => (ArticleStatus::New, None),
        CacheDecision::Refetch(reason) => {
            warn!(%reason, slug = %identity.slug, "Refetching stored article");
            (ArticleStatus::StaleRefetched, Some(reason))
        }
    };

    let result = fetch_and_store(config, fetcher, template, link, &identity, status).await;
    match (&result, stale) {
        (Err(e), Some(reason)) if reason != StaleReason::Forced => {
            warn!(error = %e, %reason, slug = %identity.slug, "Refetch failed; dropping stale copy");
            cache::discard(&identity).await?;
        }
        _ => {}
    }
    result
}

async fn fetch_and_store<F: PageFetcher>(
    config: &HarvestConfig,
    fetcher: &F,
    template: &ArticleTemplate,
    link: &CandidateLink,
    identity: &ArticleIdentity,
    status: ArticleStatus,
) -> Result<ArticleRecord> {
    let page = fetcher.fetch(&identity.bilingual_url).await;
    if !config.politeness_delay.is_zero() {
        tokio::time::sleep(config.politeness_delay).await;
    }
    let page = page?;

    let record = normalize::normalize(&page, identity, &link.title_hint, &config.site, status)?;
    article::write_article(identity, &record, template).await?;
    Ok(record)
}
