//! Plain HTTP fetcher.
//!
//! Good enough for the bilingual article pages, which are server-rendered.
//! A 404 on the bilingual variant is reported as
//! [`HarvestError::NotAvailable`] so the caller can skip quietly.

use super::{PageFetcher, USER_AGENT, document_title};
use crate::errors::{HarvestError, Result};
use crate::models::FetchedPage;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HarvestError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let fetch_err = |e: reqwest::Error| HarvestError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(fetch_err)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(HarvestError::NotAvailable {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let response = response.error_for_status().map_err(fetch_err)?;
        let final_url = response.url().to_string();
        let html = response.text().await.map_err(fetch_err)?;
        let title = document_title(&html);

        debug!(bytes = html.len(), %final_url, %title, "Fetched page");
        Ok(FetchedPage {
            url: final_url,
            html,
            title,
        })
    }
}
