//! The persisted article catalog.
//!
//! Rebuilt in full on every run from this run's records plus, optionally, the
//! archived records read back from sidecars. Never patched in place.
//!
//! # Output
//!
//! ```text
//! output_root/
//! └── articles.json    # JSON array of CatalogEntry, newest first
//! ```

use crate::errors::Result;
use crate::models::{ArticleRecord, CatalogEntry};
use crate::utils::write_atomic;
use itertools::Itertools;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub const CATALOG_FILE: &str = "articles.json";

/// Merge and order records into catalog entries.
///
/// Records from this run come first, so when an archived record has the same
/// stored path the fresh one wins. The sort is stable: entries sharing a date
/// keep discovery order.
pub fn build_catalog(current: &[ArticleRecord], archived: Vec<ArticleRecord>) -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = current
        .iter()
        .cloned()
        .chain(archived)
        .unique_by(|r| r.relative_url.clone())
        .map(|r| r.to_catalog_entry())
        .collect();
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}

/// Write `articles.json` under `output_root`.
#[instrument(level = "info", skip_all, fields(root = %output_root.display(), count = entries.len()))]
pub async fn write_catalog(output_root: &Path, entries: &[CatalogEntry]) -> Result<PathBuf> {
    let path = output_root.join(CATALOG_FILE);
    let json = serde_json::to_string_pretty(entries)?;
    write_atomic(&path, json.as_bytes()).await?;
    info!(path = %path.display(), "Wrote catalog");
    Ok(path)
}
