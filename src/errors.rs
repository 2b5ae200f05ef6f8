//! Error taxonomy for a harvest run.
//!
//! Only [`HarvestError::HomepageFetchFailed`], template loading failures and an
//! unwritable output root abort a run. Everything else is caught at the
//! per-candidate boundary in [`crate::harvest`], logged, and skipped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("homepage fetch failed for {url}: {reason}")]
    HomepageFetchFailed { url: String, reason: String },

    #[error("page at {url} is a not-found page (marker {marker:?})")]
    InvalidPage { url: String, marker: String },

    #[error("no content container found at {url}")]
    ContentNotFound { url: String },

    #[error("cached record {path} is stale: {reason}")]
    StaleCacheRecord { path: String, reason: String },

    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("bilingual variant not available at {url} (HTTP {status})")]
    NotAvailable { url: String, status: u16 },

    #[error("template error: {0}")]
    Template(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl HarvestError {
    /// Errors that end the whole run instead of one candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::HomepageFetchFailed { .. } | Self::Template(_) | Self::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let homepage = HarvestError::HomepageFetchFailed {
            url: "https://cn.nytimes.com".into(),
            reason: "timeout".into(),
        };
        assert!(homepage.is_fatal());

        let invalid = HarvestError::InvalidPage {
            url: "https://cn.nytimes.com/x".into(),
            marker: "Page Not Found".into(),
        };
        assert!(!invalid.is_fatal());
        assert!(!HarvestError::ContentNotFound { url: "u".into() }.is_fatal());
    }

    #[test]
    fn test_display_includes_context() {
        let e = HarvestError::ContentNotFound {
            url: "https://cn.nytimes.com/world/20250601/some-slug/dual/".into(),
        };
        assert!(e.to_string().contains("some-slug"));
    }
}
