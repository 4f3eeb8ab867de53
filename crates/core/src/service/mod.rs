//! Cache-or-fetch orchestration for one statistics result set.
//!
//! `StatsService` is the only entry point the presentation layer uses to get
//! records: it consults the cache, falls back to paginated fetching, and
//! stores fresh results. `FetchWorker` runs it off the interactive path.

mod worker;

pub use worker::{FetchEvent, FetchWorker};

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheError, StatsCache};
use crate::config::Config;
use crate::fetcher::{FetchError, PageFetcher, ReqwestTransport};
use crate::metrics::{CACHE_LOOKUPS, FETCH_DURATION};
use crate::paginator::Paginator;
use crate::stats::{FetchProgress, FetchResult, PackageStat, StatsKey};

/// Progress notification, called after every page.
pub type ProgressFn = dyn Fn(FetchProgress) + Send + Sync;
/// Cache-hit notification with the records and their age in minutes.
pub type CacheHitFn = dyn Fn(&[PackageStat], u64) + Send + Sync;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A newer fetch was started before this one finished; nothing was stored.
    #[error("Fetch superseded by a newer request")]
    Superseded,
}

pub struct StatsService {
    paginator: Paginator,
    cache: Arc<dyn StatsCache>,
    ttl: Duration,
}

impl StatsService {
    pub fn new(paginator: Paginator, cache: Arc<dyn StatsCache>, ttl: Duration) -> Self {
        Self {
            paginator,
            cache,
            ttl,
        }
    }

    /// Build a service talking to the configured upstream over HTTP.
    pub fn from_config(config: &Config, cache: Arc<dyn StatsCache>) -> Result<Self, FetchError> {
        let transport = Arc::new(ReqwestTransport::from_config(&config.upstream)?);
        let fetcher = PageFetcher::new(transport, config.upstream.retry_policy());
        let paginator = Paginator::new(fetcher, config.upstream.paginator_config());
        Ok(Self::new(paginator, cache, config.cache.ttl()))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return records for `key`, from the cache when a fresh entry exists
    /// and `force` is false, otherwise from the source.
    ///
    /// A fresh fetch is always written back to the cache. On failure nothing
    /// is stored and no partial result is returned.
    pub async fn fetch(
        &self,
        key: &StatsKey,
        force: bool,
        on_progress: &ProgressFn,
        on_cache_hit: &CacheHitFn,
    ) -> Result<FetchResult, StatsError> {
        self.fetch_if_current(key, force, on_progress, on_cache_hit, &|| true)
            .await
    }

    /// Like [`fetch`](Self::fetch), but a network result is only stored and
    /// returned while `is_current()` still holds once all pages are in.
    pub async fn fetch_if_current(
        &self,
        key: &StatsKey,
        force: bool,
        on_progress: &ProgressFn,
        on_cache_hit: &CacheHitFn,
        is_current: &(dyn Fn() -> bool + Send + Sync),
    ) -> Result<FetchResult, StatsError> {
        let started = Instant::now();

        if force {
            CACHE_LOOKUPS.with_label_values(&["bypass"]).inc();
        } else {
            match self.cache.load(key).await {
                Ok(Some(entry)) if entry.records.is_empty() => {
                    CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
                    debug!(key = %key, "Cached entry holds no records");
                }
                Ok(Some(entry)) if entry.is_fresh(self.ttl) => {
                    CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
                    let age_minutes = entry.age_minutes();
                    info!(key = %key, records = entry.records.len(), age_minutes, "Serving statistics from cache");
                    on_cache_hit(&entry.records, age_minutes);
                    FETCH_DURATION
                        .with_label_values(&["cache"])
                        .observe(started.elapsed().as_secs_f64());
                    return Ok(FetchResult {
                        key: key.clone(),
                        records: entry.records,
                        from_cache: true,
                        cache_age_minutes: age_minutes,
                    });
                }
                Ok(Some(entry)) => {
                    CACHE_LOOKUPS.with_label_values(&["stale"]).inc();
                    debug!(key = %key, age_secs = entry.age_secs, "Cache entry is stale");
                }
                Ok(None) => {
                    CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
                }
                Err(e) => {
                    CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
                    warn!(key = %key, error = %e, "Cache read failed, fetching from source");
                }
            }
        }

        info!(key = %key, force, "Fetching statistics from source");
        let records = self.paginator.fetch_all(key, on_progress).await?;

        if !is_current() {
            info!(key = %key, records = records.len(), "Discarding superseded fetch");
            return Err(StatsError::Superseded);
        }

        self.cache.save(key, &records).await?;
        FETCH_DURATION
            .with_label_values(&["network"])
            .observe(started.elapsed().as_secs_f64());
        info!(key = %key, records = records.len(), "Fetched and cached statistics");

        Ok(FetchResult {
            key: key.clone(),
            records,
            from_cache: false,
            cache_age_minutes: 0,
        })
    }

    /// Drop every cached result set.
    pub async fn clear_cache(&self) -> Result<(), StatsError> {
        self.cache.clear().await?;
        info!("Cleared statistics cache");
        Ok(())
    }
}
