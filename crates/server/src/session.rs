//! The server's single loaded result set, fed by the background fetch worker.
//!
//! All fetches started through [`Session::load`] report back over the
//! worker's event channel. One consumer task applies those events in order
//! and drops any whose generation has been superseded, so the session only
//! ever shows the outcome of the most recent load. A failed load keeps the
//! previous records.

use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use l10n_core::aggregate::{low_translated, LOW_TRANSLATION_THRESHOLD};
use l10n_core::{
    FetchEvent, FetchProgress, FetchResult, FetchWorker, PackageStat, SettingsStore, StatsKey,
    StatsService,
};

use crate::api::WsBroadcaster;
use crate::metrics::{FETCH_EVENTS, SESSION_RECORDS};

/// Package names listed in a low-translation notice.
const LOW_TRANSLATION_PREVIEW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Nothing requested yet.
    Idle,
    Loading,
    Ready,
    /// The most recent load failed; earlier records (if any) are still shown.
    Failed,
}

/// Point-in-time copy of the session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub generation: u64,
    /// Key of the load in progress or most recently requested.
    pub requested: Option<StatsKey>,
    /// Key the current records belong to.
    pub loaded: Option<StatsKey>,
    pub progress: Option<FetchProgress>,
    pub from_cache: bool,
    pub cache_age_minutes: u64,
    pub error: Option<String>,
    #[serde(skip)]
    pub records: Arc<Vec<PackageStat>>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            generation: 0,
            requested: None,
            loaded: None,
            progress: None,
            from_cache: false,
            cache_age_minutes: 0,
            error: None,
            records: Arc::new(Vec::new()),
        }
    }
}

pub struct Session {
    worker: FetchWorker,
    view: RwLock<SessionSnapshot>,
    broadcaster: WsBroadcaster,
    settings: Arc<SettingsStore>,
}

impl Session {
    /// Create the session and spawn the task consuming `events`.
    ///
    /// The task exits once the session is dropped.
    pub fn start(
        worker: FetchWorker,
        events: mpsc::Receiver<FetchEvent>,
        broadcaster: WsBroadcaster,
        settings: Arc<SettingsStore>,
    ) -> Arc<Self> {
        let session = Arc::new(Self {
            worker,
            view: RwLock::new(SessionSnapshot::default()),
            broadcaster,
            settings,
        });
        tokio::spawn(consume(Arc::downgrade(&session), events));
        session
    }

    pub fn service(&self) -> &Arc<StatsService> {
        self.worker.service()
    }

    /// Start loading `key` in the background, superseding any load in
    /// flight. Returns the generation of the new load.
    pub async fn load(&self, key: StatsKey, force: bool) -> u64 {
        // Held across start() so the consumer cannot apply this
        // generation's events before the view says Loading.
        let mut view = self.view.write().await;
        let generation = self.worker.start(key.clone(), force);
        view.status = SessionStatus::Loading;
        view.generation = generation;
        view.requested = Some(key);
        view.progress = None;
        view.error = None;
        generation
    }

    /// Abandon the load in flight, keeping the current records.
    pub async fn cancel(&self) {
        let mut view = self.view.write().await;
        self.worker.cancel();
        view.generation = self.worker.current_generation();
        view.progress = None;
        if view.status == SessionStatus::Loading {
            view.status = if view.loaded.is_some() {
                SessionStatus::Ready
            } else {
                SessionStatus::Idle
            };
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.view.read().await.clone()
    }

    async fn apply(&self, event: FetchEvent) {
        let generation = event.generation();
        let kind = event_kind(&event);

        let mut view = self.view.write().await;
        if !self.worker.is_current(generation) {
            FETCH_EVENTS.with_label_values(&[kind, "stale"]).inc();
            debug!(generation, kind, "Dropping event from superseded fetch");
            return;
        }
        FETCH_EVENTS.with_label_values(&[kind, "applied"]).inc();

        match event {
            FetchEvent::Started { key, force, .. } => {
                view.status = SessionStatus::Loading;
                view.requested = Some(key.clone());
                drop(view);
                self.broadcaster.fetch_started(generation, &key, force);
            }
            FetchEvent::Progress { progress, .. } => {
                view.progress = Some(progress);
                drop(view);
                self.broadcaster
                    .fetch_progress(generation, progress.loaded, progress.total);
            }
            FetchEvent::CacheHit { age_minutes, .. } => {
                drop(view);
                self.broadcaster.cache_hit(generation, age_minutes);
            }
            FetchEvent::Loaded { result, .. } => {
                let FetchResult {
                    key,
                    records,
                    from_cache,
                    cache_age_minutes,
                } = result;
                let records = Arc::new(records);

                view.status = SessionStatus::Ready;
                view.loaded = Some(key.clone());
                view.records = Arc::clone(&records);
                view.from_cache = from_cache;
                view.cache_age_minutes = cache_age_minutes;
                view.error = None;
                drop(view);

                SESSION_RECORDS.set(records.len() as i64);
                info!(key = %key, packages = records.len(), from_cache, "Session loaded");
                self.broadcaster.loaded(
                    generation,
                    &key,
                    records.len(),
                    from_cache,
                    cache_age_minutes,
                );
                self.notify_low_translation(&key, &records).await;
            }
            FetchEvent::Failed { key, message, .. } => {
                view.status = SessionStatus::Failed;
                view.error = Some(message.clone());
                view.progress = None;
                drop(view);

                warn!(key = %key, error = %message, "Session load failed");
                self.broadcaster.fetch_failed(generation, &key, &message);
            }
        }
    }

    async fn notify_low_translation(&self, key: &StatsKey, records: &[PackageStat]) {
        let enabled = match self.settings.load().await {
            Ok(settings) => settings.notifications_enabled,
            Err(e) => {
                warn!(error = %e, "Could not read settings, skipping notification");
                false
            }
        };
        if !enabled {
            return;
        }

        let low = low_translated(records, LOW_TRANSLATION_THRESHOLD);
        if low.is_empty() {
            return;
        }
        let preview = low
            .iter()
            .take(LOW_TRANSLATION_PREVIEW)
            .map(|stat| stat.name.clone())
            .collect();
        self.broadcaster.low_translation(key, low.len(), preview);
    }
}

fn event_kind(event: &FetchEvent) -> &'static str {
    match event {
        FetchEvent::Started { .. } => "started",
        FetchEvent::Progress { .. } => "progress",
        FetchEvent::CacheHit { .. } => "cache_hit",
        FetchEvent::Loaded { .. } => "loaded",
        FetchEvent::Failed { .. } => "failed",
    }
}

async fn consume(session: Weak<Session>, mut events: mpsc::Receiver<FetchEvent>) {
    while let Some(event) = events.recv().await {
        let Some(session) = session.upgrade() else {
            break;
        };
        session.apply(event).await;
    }
    debug!("Fetch event consumer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use l10n_core::testing::fixtures::{self, numbered_rows, stats_page_html, PageRow, SITE_URL};
    use l10n_core::testing::{MemoryCache, MockTransport};
    use l10n_core::{
        PageFetcher, Paginator, PaginatorConfig, RetryPolicy, SettingsPatch, StatsCache,
    };
    use tempfile::TempDir;

    use crate::api::ws::WsMessage;

    const BASE_URL: &str = "http://lp.test/ubuntu";

    struct Harness {
        session: Arc<Session>,
        transport: Arc<MockTransport>,
        cache: MemoryCache,
        settings: Arc<SettingsStore>,
        messages: tokio::sync::broadcast::Receiver<WsMessage>,
        _dir: TempDir,
    }

    fn harness() -> Harness {
        let transport = Arc::new(MockTransport::new());
        let cache = MemoryCache::new();
        let fetcher = PageFetcher::new(
            transport.clone(),
            RetryPolicy {
                max_retries: 0,
                backoff_base: Duration::from_millis(1),
            },
        );
        let paginator = Paginator::new(
            fetcher,
            PaginatorConfig {
                base_url: BASE_URL.to_string(),
                site_url: SITE_URL.to_string(),
                page_size: 300,
                page_delay: Duration::ZERO,
            },
        );
        let service = Arc::new(StatsService::new(
            paginator,
            Arc::new(cache.clone()) as Arc<dyn StatsCache>,
            Duration::from_secs(3600),
        ));
        let (worker, events) = FetchWorker::channel(service, 64);

        let dir = tempfile::tempdir().unwrap();
        let settings = Arc::new(SettingsStore::new(dir.path().join("config.json")));
        let broadcaster = WsBroadcaster::new(64);
        let messages = broadcaster.subscribe();
        let session = Session::start(worker, events, broadcaster, settings.clone());

        Harness {
            session,
            transport,
            cache,
            settings,
            messages,
            _dir: dir,
        }
    }

    fn key(lang: &str) -> StatsKey {
        StatsKey::new("noble", lang).unwrap()
    }

    fn page_url(key: &StatsKey) -> String {
        PaginatorConfig {
            base_url: BASE_URL.to_string(),
            ..PaginatorConfig::default()
        }
        .page_url(key, 0)
    }

    async fn wait_for_status(session: &Session, status: SessionStatus) -> SessionSnapshot {
        for _ in 0..200 {
            let snapshot = session.snapshot().await;
            if snapshot.status == status {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session never reached {:?}", status);
    }

    async fn next_of_kind(
        messages: &mut tokio::sync::broadcast::Receiver<WsMessage>,
        kind: &str,
    ) -> WsMessage {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(2), messages.recv())
                .await
                .expect("timed out waiting for message")
                .unwrap();
            if msg.kind() == kind {
                return msg;
            }
        }
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let h = harness();
        let snapshot = h.session.snapshot().await;
        assert_eq!(snapshot.status, SessionStatus::Idle);
        assert!(snapshot.records.is_empty());
    }

    #[tokio::test]
    async fn test_load_from_network() {
        let mut h = harness();
        let key = key("sv");
        h.transport
            .serve(&page_url(&key), &stats_page_html(&numbered_rows(0, 3), Some(3)));

        let generation = h.session.load(key.clone(), false).await;
        assert_eq!(generation, 1);

        let snapshot = wait_for_status(&h.session, SessionStatus::Ready).await;
        assert_eq!(snapshot.records.len(), 3);
        assert_eq!(snapshot.loaded, Some(key));
        assert!(!snapshot.from_cache);

        let msg = next_of_kind(&mut h.messages, "loaded").await;
        assert!(matches!(msg, WsMessage::Loaded { packages: 3, .. }));
    }

    #[tokio::test]
    async fn test_load_from_cache() {
        let h = harness();
        let key = key("sv");
        h.cache
            .insert_aged(&key, vec![fixtures::package_stat("apt", 90.0, 1, 10)], 600.0)
            .await;

        h.session.load(key, false).await;

        let snapshot = wait_for_status(&h.session, SessionStatus::Ready).await;
        assert!(snapshot.from_cache);
        assert_eq!(snapshot.cache_age_minutes, 10);
        assert_eq!(h.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_records() {
        let h = harness();
        let sv = key("sv");
        h.cache
            .insert_aged(&sv, vec![fixtures::package_stat("apt", 90.0, 1, 10)], 0.0)
            .await;
        h.session.load(sv.clone(), false).await;
        wait_for_status(&h.session, SessionStatus::Ready).await;

        // No mock response for the forced refresh
        h.session.load(sv.clone(), true).await;

        let snapshot = wait_for_status(&h.session, SessionStatus::Failed).await;
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.loaded, Some(sv));
        assert!(snapshot.error.is_some());
    }

    #[tokio::test]
    async fn test_superseded_load_is_not_applied() {
        let h = harness();
        let sv = key("sv");
        let da = key("da");
        h.transport
            .serve(&page_url(&sv), &stats_page_html(&numbered_rows(0, 2), Some(2)));
        h.transport.serve(
            &page_url(&da),
            &stats_page_html(&[PageRow::new("dpkg", 100.0, 0, 0, 0, 5)], Some(1)),
        );
        h.transport.set_latency(Duration::from_millis(100));

        h.session.load(sv.clone(), false).await;
        let latest = h.session.load(da.clone(), false).await;

        let snapshot = wait_for_status(&h.session, SessionStatus::Ready).await;
        assert_eq!(snapshot.generation, latest);
        assert_eq!(snapshot.loaded, Some(da));
        assert_eq!(snapshot.records[0].name, "dpkg");

        // The superseded fetch never reached the cache
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(h.cache.stored(&sv).await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_returns_to_idle() {
        let h = harness();
        let sv = key("sv");
        h.transport
            .serve(&page_url(&sv), &stats_page_html(&numbered_rows(0, 2), Some(2)));
        h.transport.set_latency(Duration::from_millis(200));

        h.session.load(sv, false).await;
        h.session.cancel().await;

        let snapshot = h.session.snapshot().await;
        assert_eq!(snapshot.status, SessionStatus::Idle);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(h.session.snapshot().await.status, SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_low_translation_notice_when_enabled() {
        let mut h = harness();
        h.settings
            .update(&SettingsPatch {
                notifications_enabled: Some(true),
                ..SettingsPatch::default()
            })
            .await
            .unwrap();
        let key = key("sv");
        h.cache
            .insert_aged(
                &key,
                vec![
                    fixtures::package_stat("apt", 100.0, 0, 10),
                    fixtures::package_stat("bash", 20.0, 8, 10),
                    fixtures::package_stat("cron", 0.0, 10, 10),
                ],
                0.0,
            )
            .await;

        h.session.load(key, false).await;

        match next_of_kind(&mut h.messages, "low_translation").await {
            WsMessage::LowTranslation {
                count, packages, ..
            } => {
                assert_eq!(count, 1);
                assert_eq!(packages, vec!["bash".to_string()]);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_notice_when_disabled() {
        let mut h = harness();
        let key = key("sv");
        h.cache
            .insert_aged(&key, vec![fixtures::package_stat("bash", 20.0, 8, 10)], 0.0)
            .await;

        h.session.load(key, false).await;
        next_of_kind(&mut h.messages, "loaded").await;

        // Nothing else is queued after the loaded message
        assert!(h.messages.try_recv().is_err());
    }
}
