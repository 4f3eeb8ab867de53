//! Single background fetch at a time, reported through a channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use super::{StatsError, StatsService};
use crate::stats::{FetchProgress, FetchResult, PackageStat, StatsKey};

/// Lifecycle events of a background fetch, tagged with the generation that
/// produced them. Consumers drop events whose generation is no longer current.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetchEvent {
    Started {
        generation: u64,
        key: StatsKey,
        force: bool,
    },
    Progress {
        generation: u64,
        #[serde(flatten)]
        progress: FetchProgress,
    },
    CacheHit {
        generation: u64,
        age_minutes: u64,
    },
    Loaded {
        generation: u64,
        result: FetchResult,
    },
    Failed {
        generation: u64,
        key: StatsKey,
        message: String,
    },
}

impl FetchEvent {
    pub fn generation(&self) -> u64 {
        match self {
            FetchEvent::Started { generation, .. }
            | FetchEvent::Progress { generation, .. }
            | FetchEvent::CacheHit { generation, .. }
            | FetchEvent::Loaded { generation, .. }
            | FetchEvent::Failed { generation, .. } => *generation,
        }
    }
}

/// Runs at most one `StatsService` fetch in the background.
///
/// Starting a fetch aborts the previous one. If the previous task is past
/// its last await point when aborted, the generation check keeps it from
/// writing the cache.
pub struct FetchWorker {
    service: Arc<StatsService>,
    events: mpsc::Sender<FetchEvent>,
    generation: Arc<AtomicU64>,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl FetchWorker {
    pub fn new(service: Arc<StatsService>, events: mpsc::Sender<FetchEvent>) -> Self {
        Self {
            service,
            events,
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: Mutex::new(None),
        }
    }

    /// Worker plus the receiving end of its event channel.
    pub fn channel(service: Arc<StatsService>, capacity: usize) -> (Self, mpsc::Receiver<FetchEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(service, tx), rx)
    }

    pub fn service(&self) -> &Arc<StatsService> {
        &self.service
    }

    /// Generation of the most recently started fetch (0 before the first).
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == generation
    }

    /// Start fetching `key`, superseding any fetch in flight. Returns the
    /// new generation.
    pub fn start(&self, key: StatsKey, force: bool) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let service = Arc::clone(&self.service);
        let events = self.events.clone();
        let counter = Arc::clone(&self.generation);
        let handle = tokio::spawn(async move {
            run_fetch(service, events, counter, generation, key, force).await;
        });

        self.replace_in_flight(Some(handle.abort_handle()));
        generation
    }

    /// Abort the fetch in flight, if any, and invalidate its events.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.replace_in_flight(None);
    }

    fn replace_in_flight(&self, next: Option<AbortHandle>) {
        let previous = match self.in_flight.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, next),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), next),
        };
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

impl Drop for FetchWorker {
    fn drop(&mut self) {
        self.replace_in_flight(None);
    }
}

async fn run_fetch(
    service: Arc<StatsService>,
    events: mpsc::Sender<FetchEvent>,
    counter: Arc<AtomicU64>,
    generation: u64,
    key: StatsKey,
    force: bool,
) {
    let _ = events
        .send(FetchEvent::Started {
            generation,
            key: key.clone(),
            force,
        })
        .await;

    // Progress and cache-hit notices are best effort
    let progress_tx = events.clone();
    let on_progress = move |progress: FetchProgress| {
        let _ = progress_tx.try_send(FetchEvent::Progress {
            generation,
            progress,
        });
    };
    let hit_tx = events.clone();
    let on_cache_hit = move |_: &[PackageStat], age_minutes: u64| {
        let _ = hit_tx.try_send(FetchEvent::CacheHit {
            generation,
            age_minutes,
        });
    };
    let is_current = move || counter.load(Ordering::SeqCst) == generation;

    let outcome = service
        .fetch_if_current(&key, force, &on_progress, &on_cache_hit, &is_current)
        .await;
    let event = match outcome {
        Ok(result) => FetchEvent::Loaded { generation, result },
        Err(StatsError::Superseded) => {
            debug!(key = %key, generation, "Fetch superseded");
            return;
        }
        Err(e) => {
            warn!(key = %key, generation, error = %e, "Fetch failed");
            FetchEvent::Failed {
                generation,
                key,
                message: e.to_string(),
            }
        }
    };
    let _ = events.send(event).await;
}
