//! Time-bounded statistics cache keyed by (distribution, language).
//!
//! All entries live in one document. Staleness is checked by the caller at
//! read time; stale entries are overwritten by the next save, never evicted.

mod json_store;

pub use json_store::JsonFileCache;

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use thiserror::Error;

use crate::stats::{PackageStat, StatsKey};

/// Errors that can occur in cache operations.
///
/// Only I/O-level failures surface here; a malformed document is treated as
/// empty.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Failed to encode cache document: {0}")]
    Encode(String),
}

/// A cache entry as read back, with its age at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedStats {
    pub records: Vec<PackageStat>,
    /// Unix epoch seconds of the fetch that produced `records`.
    pub fetched_at: f64,
    /// Seconds elapsed since `fetched_at`, never negative.
    pub age_secs: f64,
}

impl CachedStats {
    pub fn new(records: Vec<PackageStat>, fetched_at: f64) -> Self {
        let age_secs = (now_epoch_secs() - fetched_at).max(0.0);
        Self {
            records,
            fetched_at,
            age_secs,
        }
    }

    /// Whether the entry may still be reused under `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age_secs < ttl.as_secs_f64()
    }

    /// Whole minutes of age, as reported to the user.
    pub fn age_minutes(&self) -> u64 {
        (self.age_secs / 60.0) as u64
    }
}

/// Persistent store of fetched statistics.
#[async_trait]
pub trait StatsCache: Send + Sync {
    /// Entry for `key` regardless of age, or `None` if absent or unreadable.
    async fn load(&self, key: &StatsKey) -> Result<Option<CachedStats>, CacheError>;

    /// Store `records` for `key` stamped with the current time, keeping all
    /// other entries.
    async fn save(&self, key: &StatsKey, records: &[PackageStat]) -> Result<(), CacheError>;

    /// Remove every entry.
    async fn clear(&self) -> Result<(), CacheError>;
}

/// Current time as fractional Unix epoch seconds.
pub fn now_epoch_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_stats_freshness_boundary() {
        let ttl = Duration::from_secs(3600);
        let now = now_epoch_secs();

        assert!(CachedStats::new(vec![], now - 3599.0).is_fresh(ttl));
        assert!(!CachedStats::new(vec![], now - 3601.0).is_fresh(ttl));
    }

    #[test]
    fn test_age_minutes_truncates() {
        let entry = CachedStats::new(vec![], now_epoch_secs() - 179.0);
        assert_eq!(entry.age_minutes(), 2);
    }

    #[test]
    fn test_future_timestamp_clamps_age() {
        let entry = CachedStats::new(vec![], now_epoch_secs() + 600.0);
        assert_eq!(entry.age_secs, 0.0);
        assert_eq!(entry.age_minutes(), 0);
    }
}
