//! Walks every result page of one (distribution, language) statistics set.
//!
//! Pages are requested strictly one after another with a fixed delay in
//! between; the number of pages comes from the total reported on the first.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info};

use crate::fetcher::{FetchError, PageFetcher};
use crate::metrics::PAGES_FETCHED;
use crate::parser::StatsPage;
use crate::stats::{FetchProgress, PackageStat, StatsKey};

/// Page layout and politeness settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatorConfig {
    /// Distribution root, e.g. `https://translations.launchpad.net/ubuntu`.
    pub base_url: String,
    /// Prefix for relative template links.
    pub site_url: String,
    pub page_size: usize,
    /// Pause before every page after the first.
    pub page_delay: Duration,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://translations.launchpad.net/ubuntu".to_string(),
            site_url: "https://translations.launchpad.net".to_string(),
            page_size: 300,
            page_delay: Duration::from_millis(800),
        }
    }
}

impl PaginatorConfig {
    /// URL of the page starting at `start`; the first page carries no offset.
    pub fn page_url(&self, key: &StatsKey, start: usize) -> String {
        let mut url = format!(
            "{}/{}/+lang/{}/+index?batch={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&key.distro),
            urlencoding::encode(&key.lang),
            self.page_size
        );
        if start > 0 {
            url.push_str(&format!("&start={}", start));
        }
        url
    }
}

pub struct Paginator {
    fetcher: PageFetcher,
    config: PaginatorConfig,
}

impl Paginator {
    pub fn new(fetcher: PageFetcher, config: PaginatorConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &PaginatorConfig {
        &self.config
    }

    /// Fetch and concatenate all pages in server order.
    ///
    /// `on_progress` runs after every page with the records collected so far.
    /// Any page failure aborts the whole fetch; partial results are discarded.
    pub async fn fetch_all(
        &self,
        key: &StatsKey,
        on_progress: &(dyn Fn(FetchProgress) + Send + Sync),
    ) -> Result<Vec<PackageStat>, FetchError> {
        let started = Instant::now();
        let page_size = self.config.page_size.max(1);

        let first = self.fetch_page(key, 0).await?;
        let total = first.total;
        let mut records = first.records;
        on_progress(FetchProgress {
            loaded: records.len(),
            total,
        });

        let mut start = page_size;
        while start < total {
            sleep(self.config.page_delay).await;
            let page = self.fetch_page(key, start).await?;
            records.extend(page.records);
            start += page_size;
            on_progress(FetchProgress {
                loaded: records.len(),
                total,
            });
        }

        info!(
            key = %key,
            records = records.len(),
            total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched all result pages"
        );
        Ok(records)
    }

    async fn fetch_page(&self, key: &StatsKey, start: usize) -> Result<StatsPage, FetchError> {
        let url = self.config.page_url(key, start);
        debug!(url = %url, start, "Requesting result page");

        let html = self.fetcher.get(&url).await?;
        let page = StatsPage::parse(&html, &self.config.site_url);
        PAGES_FETCHED.inc();

        debug!(start, rows = page.records.len(), total = page.total, "Parsed result page");
        Ok(page)
    }
}
