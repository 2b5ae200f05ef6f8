//! Local-cache checks: decide whether a candidate needs downloading.
//!
//! Re-fetching is driven by metadata quality, not only by existence. A copy
//! stored by older, weaker extraction (no foreign headline, a brand name in
//! place of one, leftover translation credits, or a record flagged degraded)
//! is fetched again without needing a full rebuild.
//!
//! Metadata comes from the JSON sidecar written next to each article. Stores
//! predating sidecars are read through the literal headline markers of the
//! article template instead.

use crate::config::SiteProfile;
use crate::errors::{HarvestError, Result};
use crate::harvest::links::ARTICLES_DIR;
use crate::models::{ArticleIdentity, ArticleMeta, ArticleRecord, ArticleStatus, META_VERSION};
use crate::utils::{collapse_whitespace, is_brand_name};
use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

static LEGACY_FOREIGN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<h[12] class="en-headline">(.*?)</h[12]>"#).unwrap());
static LEGACY_NATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<h[12] class="cn-headline">(.*?)</h[12]>"#).unwrap());

/// Why a stored article is fetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    Forced,
    MissingForeignTitle,
    BrandForeignTitle,
    BoilerplateJunk,
    Degraded,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Forced => "refetch forced",
            Self::MissingForeignTitle => "foreign headline missing",
            Self::BrandForeignTitle => "foreign headline is a brand name",
            Self::BoilerplateJunk => "stored copy contains translation boilerplate",
            Self::Degraded => "metadata was degraded at extraction",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheDecision {
    /// Nothing on disk.
    FetchNew,
    /// A stored copy exists but must be replaced.
    Refetch(StaleReason),
    /// The stored copy is good. `from_sidecar` is false when the metadata
    /// came from the legacy headline markers.
    SkipCached {
        record: ArticleRecord,
        from_sidecar: bool,
    },
}

/// Read a sidecar, ignoring missing files and unknown versions.
pub async fn read_meta(path: &Path) -> Option<ArticleMeta> {
    let raw = fs::read_to_string(path).await.ok()?;
    match serde_json::from_str::<ArticleMeta>(&raw) {
        Ok(meta) if meta.version == META_VERSION => Some(meta),
        Ok(meta) => {
            debug!(path = %path.display(), version = meta.version, "Ignoring sidecar with unknown version");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable sidecar");
            None
        }
    }
}

fn legacy_heading(re: &Regex, markup: &str) -> String {
    re.captures(markup)
        .and_then(|c| c.get(1))
        .map(|m| collapse_whitespace(&decode_html_entities(m.as_str())))
        .unwrap_or_default()
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Delete a stored article and its sidecar, e.g. a stale copy whose refetch
/// failed.
pub async fn discard(identity: &ArticleIdentity) -> Result<()> {
    remove_if_present(&identity.storage_path).await?;
    remove_if_present(&identity.meta_path).await?;
    info!(path = %identity.storage_path.display(), "Discarded stored copy");
    Ok(())
}

/// Decide what to do with one candidate. Local only: never touches the network.
#[instrument(level = "info", skip_all, fields(slug = %identity.slug))]
pub async fn check(
    identity: &ArticleIdentity,
    title_hint: &str,
    force: bool,
    site: &SiteProfile,
) -> Result<CacheDecision> {
    if !fs::try_exists(&identity.storage_path).await? {
        return Ok(CacheDecision::FetchNew);
    }
    if force {
        return Ok(CacheDecision::Refetch(StaleReason::Forced));
    }

    let stored = fs::read_to_string(&identity.storage_path).await?;
    if let Some(marker) = site.not_found_marker(&stored) {
        warn!(path = %identity.storage_path.display(), marker, "Stored copy is a not-found page; deleting");
        remove_if_present(&identity.storage_path).await?;
        remove_if_present(&identity.meta_path).await?;
        return Ok(CacheDecision::FetchNew);
    }

    let meta = read_meta(&identity.meta_path).await;
    let from_sidecar = meta.is_some();
    let (title_foreign, title_native, degraded) = match &meta {
        Some(m) => (m.title_foreign.clone(), m.title_native.clone(), !m.degraded.is_empty()),
        None => (
            legacy_heading(&LEGACY_FOREIGN, &stored),
            legacy_heading(&LEGACY_NATIVE, &stored),
            false,
        ),
    };

    let junk = site
        .boilerplate_phrases
        .iter()
        .any(|p| !p.is_empty() && stored.contains(p.as_str()));

    let stale = if title_foreign.trim().is_empty() {
        Some(StaleReason::MissingForeignTitle)
    } else if is_brand_name(&title_foreign, &site.brand_names, site.brand_slack) {
        Some(StaleReason::BrandForeignTitle)
    } else if junk {
        Some(StaleReason::BoilerplateJunk)
    } else if degraded {
        Some(StaleReason::Degraded)
    } else {
        None
    };
    if let Some(reason) = stale {
        let e = HarvestError::StaleCacheRecord {
            path: identity.storage_path.display().to_string(),
            reason: reason.to_string(),
        };
        info!(error = %e, "Cached copy is stale");
        return Ok(CacheDecision::Refetch(reason));
    }

    let title_native = if title_native.is_empty() {
        collapse_whitespace(title_hint)
    } else {
        title_native
    };
    let record = match meta {
        Some(m) => {
            let mut record = m.into_record(identity.relative_url.clone(), ArticleStatus::Cached);
            record.title_native = title_native;
            record
        }
        None => ArticleRecord {
            title_native,
            title_foreign,
            author: site.default_author.clone(),
            date: identity.date,
            content_fragment: String::new(),
            source_url: identity.bilingual_url.clone(),
            status: ArticleStatus::Cached,
            degraded: Vec::new(),
            relative_url: identity.relative_url.clone(),
        },
    };
    debug!(from_sidecar, "Using cached copy");
    Ok(CacheDecision::SkipCached {
        record,
        from_sidecar,
    })
}

/// Every article already in the store, read from the sidecars.
///
/// Articles whose HTML is gone are skipped.
#[instrument(level = "info", skip_all, fields(root = %output_root.display()))]
pub async fn scan_archive(output_root: &Path) -> Result<Vec<ArticleRecord>> {
    let articles_root = output_root.join(ARTICLES_DIR);
    if !fs::try_exists(&articles_root).await? {
        return Ok(Vec::new());
    }

    let mut folders: Vec<PathBuf> = Vec::new();
    let mut entries = fs::read_dir(&articles_root).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            folders.push(entry.path());
        }
    }
    folders.sort();

    let mut records = Vec::new();
    for folder in folders {
        let mut metas: Vec<PathBuf> = Vec::new();
        let mut entries = fs::read_dir(&folder).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                metas.push(path);
            }
        }
        metas.sort();

        for meta_path in metas {
            let html_path = meta_path.with_extension("html");
            if !fs::try_exists(&html_path).await? {
                continue;
            }
            if let Some(meta) = read_meta(&meta_path).await {
                let relative = crate::models::relative_url(output_root, &html_path);
                records.push(meta.into_record(relative, ArticleStatus::Cached));
            }
        }
    }

    info!(count = records.len(), "Scanned archived articles");
    Ok(records)
}
