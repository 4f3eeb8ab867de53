//! In-memory stats cache for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cache::{CacheError, CachedStats, StatsCache};
use crate::stats::{PackageStat, StatsKey};

#[derive(Debug, Clone)]
struct Entry {
    records: Vec<PackageStat>,
    fetched_at: f64,
}

/// Mock implementation of the StatsCache trait.
///
/// Keeps entries in memory and lets tests backdate them or make the next
/// operation fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    fail_next_save: Arc<RwLock<bool>>,
    fail_next_load: Arc<RwLock<bool>>,
    saves: Arc<RwLock<usize>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry fetched `age_secs` seconds ago.
    pub async fn insert_aged(&self, key: &StatsKey, records: Vec<PackageStat>, age_secs: f64) {
        let fetched_at = crate::cache::now_epoch_secs() - age_secs;
        self.entries.write().await.insert(
            key.cache_key(),
            Entry {
                records,
                fetched_at,
            },
        );
    }

    /// Records currently stored under `key`, regardless of age.
    pub async fn stored(&self, key: &StatsKey) -> Option<Vec<PackageStat>> {
        self.entries
            .read()
            .await
            .get(&key.cache_key())
            .map(|entry| entry.records.clone())
    }

    /// Number of successful saves.
    pub async fn save_count(&self) -> usize {
        *self.saves.read().await
    }

    pub async fn fail_next_save(&self) {
        *self.fail_next_save.write().await = true;
    }

    pub async fn fail_next_load(&self) {
        *self.fail_next_load.write().await = true;
    }
}

#[async_trait]
impl StatsCache for MemoryCache {
    async fn load(&self, key: &StatsKey) -> Result<Option<CachedStats>, CacheError> {
        if std::mem::take(&mut *self.fail_next_load.write().await) {
            return Err(CacheError::Io("simulated read failure".to_string()));
        }

        let entries = self.entries.read().await;
        let Some(entry) = entries.get(&key.cache_key()) else {
            return Ok(None);
        };
        Ok(Some(CachedStats::new(entry.records.clone(), entry.fetched_at)))
    }

    async fn save(&self, key: &StatsKey, records: &[PackageStat]) -> Result<(), CacheError> {
        if std::mem::take(&mut *self.fail_next_save.write().await) {
            return Err(CacheError::Io("simulated write failure".to_string()));
        }

        self.entries.write().await.insert(
            key.cache_key(),
            Entry {
                records: records.to_vec(),
                fetched_at: crate::cache::now_epoch_secs(),
            },
        );
        *self.saves.write().await += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.write().await.clear();
        Ok(())
    }
}
