//! JSON-file implementation of the stats cache.
//!
//! Document layout, one entry per key ever fetched:
//!
//! ```json
//! { "noble_sv": { "data": [ { "name": "apt", ... } ], "timestamp": 1714000000.5 } }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{now_epoch_secs, CacheError, CachedStats, StatsCache};
use crate::stats::{PackageStat, StatsKey};

/// Whole cache document. Values stay untyped so entries this version cannot
/// read survive a rewrite.
type Document = BTreeMap<String, Value>;

#[derive(Debug, Deserialize)]
struct StoredEntry {
    #[serde(default)]
    data: Vec<Value>,
    timestamp: f64,
}

#[derive(Debug, Serialize)]
struct NewEntry<'a> {
    data: &'a [PackageStat],
    timestamp: f64,
}

/// Stats cache persisted as a single JSON document.
///
/// Reads and writes go through an in-process lock and every save is a
/// read-merge-write, so saves for different keys never drop each other.
/// The document is replaced via a temporary file and rename.
#[derive(Debug)]
pub struct JsonFileCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store `records` for `key` with an explicit fetch timestamp.
    pub async fn save_with_timestamp(
        &self,
        key: &StatsKey,
        records: &[PackageStat],
        fetched_at: f64,
    ) -> Result<(), CacheError> {
        let entry = serde_json::to_value(NewEntry {
            data: records,
            timestamp: fetched_at,
        })
        .map_err(|e| CacheError::Encode(e.to_string()))?;

        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        document.insert(key.cache_key(), entry);
        self.write_document(&document).await?;

        debug!(key = %key, records = records.len(), path = %self.path.display(), "Saved cache entry");
        Ok(())
    }

    async fn read_document(&self) -> Result<Document, CacheError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => {
                return Err(CacheError::Io(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_slice::<Document>(&bytes) {
            Ok(document) => Ok(document),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cache document is corrupt, treating as empty");
                Ok(Document::new())
            }
        }
    }

    async fn write_document(&self, document: &Document) -> Result<(), CacheError> {
        let encoded =
            serde_json::to_vec_pretty(document).map_err(|e| CacheError::Encode(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                CacheError::Io(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, encoded)
            .await
            .map_err(|e| CacheError::Io(format!("failed to write {}: {}", temp_path.display(), e)))?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| CacheError::Io(format!("failed to replace {}: {}", self.path.display(), e)))
    }
}

/// Typed records of one stored entry. Records that fail validation are
/// dropped individually.
fn decode_entry(key: &str, raw: Value) -> Option<CachedStats> {
    let entry: StoredEntry = match serde_json::from_value(raw) {
        Ok(entry) => entry,
        Err(e) => {
            warn!(key, error = %e, "Malformed cache entry, ignoring");
            return None;
        }
    };
    if !entry.timestamp.is_finite() {
        warn!(key, "Cache entry has no usable timestamp, ignoring");
        return None;
    }

    let total = entry.data.len();
    let records: Vec<PackageStat> = entry
        .data
        .into_iter()
        .filter_map(|value| serde_json::from_value::<PackageStat>(value).ok())
        .filter(|record| !record.name.is_empty())
        .collect();
    if records.len() < total {
        debug!(key, dropped = total - records.len(), "Dropped invalid cached records");
    }

    Some(CachedStats::new(records, entry.timestamp))
}

#[async_trait]
impl StatsCache for JsonFileCache {
    async fn load(&self, key: &StatsKey) -> Result<Option<CachedStats>, CacheError> {
        let cache_key = key.cache_key();
        let raw = {
            let _guard = self.lock.lock().await;
            self.read_document().await?.remove(&cache_key)
        };
        Ok(raw.and_then(|raw| decode_entry(&cache_key, raw)))
    }

    async fn save(&self, key: &StatsKey, records: &[PackageStat]) -> Result<(), CacheError> {
        self.save_with_timestamp(key, records, now_epoch_secs()).await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let _guard = self.lock.lock().await;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io(format!(
                "failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn key(distro: &str, lang: &str) -> StatsKey {
        StatsKey::new(distro, lang).unwrap()
    }

    fn cache_in(dir: &TempDir) -> JsonFileCache {
        JsonFileCache::new(dir.path().join("ubuntu-l10n").join("cache.json"))
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let records = vec![
            fixtures::package_stat("apt", 100.0, 0, 50),
            fixtures::package_stat("bash", 42.5, 23, 40),
        ];

        cache.save(&key("noble", "sv"), &records).await.unwrap();
        let loaded = cache.load(&key("noble", "sv")).await.unwrap().unwrap();

        assert_eq!(loaded.records, records);
        assert!(loaded.age_secs < 5.0);
    }

    #[tokio::test]
    async fn test_missing_document_is_absent() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        assert!(cache.load(&key("noble", "sv")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_saves_for_other_keys_are_preserved() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let swedish = vec![fixtures::package_stat("apt", 90.0, 5, 50)];
        let german = vec![fixtures::package_stat("dpkg", 10.0, 45, 50)];

        cache.save(&key("noble", "sv"), &swedish).await.unwrap();
        cache.save(&key("noble", "de"), &german).await.unwrap();

        let loaded = cache.load(&key("noble", "sv")).await.unwrap().unwrap();
        assert_eq!(loaded.records, swedish);
        let loaded = cache.load(&key("noble", "de")).await.unwrap().unwrap();
        assert_eq!(loaded.records, german);
    }

    #[tokio::test]
    async fn test_concurrent_saves_keep_every_key() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(cache_in(&dir));
        let langs = ["sv", "de", "fr", "fi", "da", "nb"];

        let handles: Vec<_> = langs
            .iter()
            .map(|lang| {
                let cache = Arc::clone(&cache);
                let lang = lang.to_string();
                tokio::spawn(async move {
                    let records = vec![fixtures::package_stat(&lang, 50.0, 5, 10)];
                    cache.save(&key("noble", &lang), &records).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        for lang in langs {
            let loaded = cache.load(&key("noble", lang)).await.unwrap().unwrap();
            assert_eq!(loaded.records[0].name, lang);
        }
    }

    #[tokio::test]
    async fn test_corrupt_document_is_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        std::fs::write(cache.path(), "{ not json").unwrap();

        assert!(cache.load(&key("noble", "sv")).await.unwrap().is_none());

        // A save replaces the corrupt document
        let records = vec![fixtures::package_stat("apt", 1.0, 9, 10)];
        cache.save(&key("noble", "sv"), &records).await.unwrap();
        let loaded = cache.load(&key("noble", "sv")).await.unwrap().unwrap();
        assert_eq!(loaded.records, records);
    }

    #[tokio::test]
    async fn test_non_object_document_is_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        std::fs::write(cache.path(), "[1, 2, 3]").unwrap();

        assert!(cache.load(&key("noble", "sv")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_entry_is_absent_but_others_load() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        std::fs::write(
            cache.path(),
            r#"{
                "noble_sv": {"data": "oops"},
                "noble_de": {"data": [{"name": "apt", "translated_pct": 12.5}], "timestamp": 1.0}
            }"#,
        )
        .unwrap();

        assert!(cache.load(&key("noble", "sv")).await.unwrap().is_none());
        let german = cache.load(&key("noble", "de")).await.unwrap().unwrap();
        assert_eq!(german.records.len(), 1);
        assert_eq!(german.records[0].translated_pct, 12.5);
        assert_eq!(german.records[0].total, 0);
    }

    #[tokio::test]
    async fn test_records_without_name_are_dropped() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        std::fs::write(
            cache.path(),
            r#"{"noble_sv": {"timestamp": 1.0, "data": [
                {"name": "apt", "total": 10},
                {"translated_pct": 50.0},
                {"name": "", "total": 3},
                {"name": "bash", "total": "many"}
            ]}}"#,
        )
        .unwrap();

        let loaded = cache.load(&key("noble", "sv")).await.unwrap().unwrap();
        let names: Vec<_> = loaded.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["apt"]);
    }

    #[tokio::test]
    async fn test_unknown_fields_are_tolerated() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        std::fs::write(
            cache.path(),
            r#"{"noble_sv": {"timestamp": 1.0, "schema": 7, "data": [
                {"name": "apt", "total": 10, "untranslated": 2, "translate_url": "https://x/apt",
                 "suggestions": 4, "license": "GPL"}
            ]}}"#,
        )
        .unwrap();

        let loaded = cache.load(&key("noble", "sv")).await.unwrap().unwrap();
        assert_eq!(loaded.records[0].translated(), 8);
        assert_eq!(loaded.records[0].detail_url, "https://x/apt");
    }

    #[tokio::test]
    async fn test_unreadable_entries_survive_rewrite() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        std::fs::write(cache.path(), r#"{"future_key": {"format": 2}}"#).unwrap();

        cache
            .save(&key("noble", "sv"), &[fixtures::package_stat("apt", 1.0, 1, 1)])
            .await
            .unwrap();

        let raw: Value = serde_json::from_slice(&std::fs::read(cache.path()).unwrap()).unwrap();
        assert_eq!(raw["future_key"]["format"], 2);
        assert!(raw["noble_sv"]["timestamp"].is_f64());
        assert_eq!(raw["noble_sv"]["data"][0]["name"], "apt");
    }

    #[tokio::test]
    async fn test_stored_timestamp_controls_age() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let ttl = std::time::Duration::from_secs(3600);
        let now = now_epoch_secs();

        cache
            .save_with_timestamp(&key("noble", "sv"), &[], now - 3599.0)
            .await
            .unwrap();
        cache
            .save_with_timestamp(&key("noble", "de"), &[], now - 3601.0)
            .await
            .unwrap();

        assert!(cache.load(&key("noble", "sv")).await.unwrap().unwrap().is_fresh(ttl));
        assert!(!cache.load(&key("noble", "de")).await.unwrap().unwrap().is_fresh(ttl));
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache
            .save(&key("noble", "sv"), &[fixtures::package_stat("apt", 1.0, 1, 1)])
            .await
            .unwrap();

        cache.clear().await.unwrap();

        assert!(!cache.path().exists());
        assert!(cache.load(&key("noble", "sv")).await.unwrap().is_none());
        // Clearing twice is fine
        cache.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_document_uses_translate_url_key() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache
            .save(&key("noble", "sv"), &[fixtures::package_stat("apt", 1.0, 1, 1)])
            .await
            .unwrap();

        let raw: Value = serde_json::from_slice(&std::fs::read(cache.path()).unwrap()).unwrap();
        assert_eq!(
            raw["noble_sv"]["data"][0]["translate_url"],
            fixtures::template_url("apt")
        );
    }
}
