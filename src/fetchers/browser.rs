//! Headless Chrome fetcher for JavaScript-driven pages.
//!
//! One browser and one tab are reused for the whole run. After every
//! navigation the fetcher waits a fixed settle delay so client-side rendering
//! can finish before the markup is read.

use super::{PageFetcher, USER_AGENT};
use crate::errors::{HarvestError, Result};
use crate::models::FetchedPage;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

pub struct BrowserFetcher {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
    settle_delay: Duration,
}

fn browser_err(url: &str, e: impl std::fmt::Display) -> HarvestError {
    HarvestError::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

impl BrowserFetcher {
    #[instrument(level = "info")]
    pub async fn launch(settle_delay: Duration) -> Result<Self> {
        let config = BrowserConfig::builder()
            .window_size(1280, 1024)
            .arg("--log-level=3")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", USER_AGENT))
            .build()
            .map_err(|e| HarvestError::Config(format!("bad browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarvestError::Config(format!("cannot launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| browser_err("about:blank", e))?;

        info!("Headless browser launched");
        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler,
            settle_delay,
        })
    }
}

impl PageFetcher for BrowserFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.page.goto(url).await.map_err(|e| browser_err(url, e))?;
        if let Err(e) = self.page.wait_for_navigation().await {
            warn!(error = %e, "Navigation wait failed; reading page anyway");
        }
        tokio::time::sleep(self.settle_delay).await;

        let html = self.page.content().await.map_err(|e| browser_err(url, e))?;
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| browser_err(url, e))?
            .unwrap_or_default();
        let final_url = self
            .page
            .url()
            .await
            .map_err(|e| browser_err(url, e))?
            .unwrap_or_else(|| url.to_string());

        debug!(bytes = html.len(), %final_url, %title, "Rendered page");
        Ok(FetchedPage {
            url: final_url,
            html,
            title,
        })
    }

    async fn close(&self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Browser did not close cleanly");
            }
            let _ = browser.wait().await;
        }
        self.handler.abort();
        info!("Headless browser closed");
    }
}
