//! WebSocket support for live fetch progress and session updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use l10n_core::StatsKey;

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

/// WebSocket message sent to clients for real-time updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// A background fetch began.
    FetchStarted {
        generation: u64,
        distro: String,
        lang: String,
        force: bool,
    },
    /// One more result page was collected.
    FetchProgress {
        generation: u64,
        loaded: usize,
        /// Total reported by the source (0 if unknown)
        total: usize,
    },
    /// The fetch was answered from the on-disk cache.
    CacheHit { generation: u64, age_minutes: u64 },
    /// A new result set replaced the session's records.
    Loaded {
        generation: u64,
        distro: String,
        lang: String,
        packages: usize,
        from_cache: bool,
        cache_age_minutes: u64,
    },
    /// The fetch failed; the previous records are still in place.
    FetchFailed {
        generation: u64,
        distro: String,
        lang: String,
        error: String,
    },
    /// Packages below the low-translation threshold (sent only when
    /// notifications are enabled).
    LowTranslation {
        distro: String,
        lang: String,
        count: usize,
        /// First few package names, for display
        packages: Vec<String>,
    },
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat { timestamp: i64 },
}

impl WsMessage {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            WsMessage::FetchStarted { .. } => "fetch_started",
            WsMessage::FetchProgress { .. } => "fetch_progress",
            WsMessage::CacheHit { .. } => "cache_hit",
            WsMessage::Loaded { .. } => "loaded",
            WsMessage::FetchFailed { .. } => "fetch_failed",
            WsMessage::LowTranslation { .. } => "low_translation",
            WsMessage::Heartbeat { .. } => "heartbeat",
        }
    }
}

/// Broadcaster for WebSocket messages using tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct WsBroadcaster {
    sender: broadcast::Sender<WsMessage>,
}

impl WsBroadcaster {
    /// Create a new broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast a message to all connected clients.
    pub fn broadcast(&self, msg: WsMessage) {
        // Ignore send errors - they just mean no one is listening
        let _ = self.sender.send(msg);
    }

    /// Subscribe to receive messages.
    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.sender.subscribe()
    }

    pub fn fetch_started(&self, generation: u64, key: &StatsKey, force: bool) {
        self.broadcast(WsMessage::FetchStarted {
            generation,
            distro: key.distro.clone(),
            lang: key.lang.clone(),
            force,
        });
    }

    pub fn fetch_progress(&self, generation: u64, loaded: usize, total: usize) {
        self.broadcast(WsMessage::FetchProgress {
            generation,
            loaded,
            total,
        });
    }

    pub fn cache_hit(&self, generation: u64, age_minutes: u64) {
        self.broadcast(WsMessage::CacheHit {
            generation,
            age_minutes,
        });
    }

    pub fn loaded(
        &self,
        generation: u64,
        key: &StatsKey,
        packages: usize,
        from_cache: bool,
        cache_age_minutes: u64,
    ) {
        self.broadcast(WsMessage::Loaded {
            generation,
            distro: key.distro.clone(),
            lang: key.lang.clone(),
            packages,
            from_cache,
            cache_age_minutes,
        });
    }

    pub fn fetch_failed(&self, generation: u64, key: &StatsKey, error: &str) {
        self.broadcast(WsMessage::FetchFailed {
            generation,
            distro: key.distro.clone(),
            lang: key.lang.clone(),
            error: error.to_string(),
        });
    }

    pub fn low_translation(&self, key: &StatsKey, count: usize, packages: Vec<String>) {
        self.broadcast(WsMessage::LowTranslation {
            distro: key.distro.clone(),
            lang: key.lang.clone(),
            count,
            packages,
        });
    }

    pub fn heartbeat(&self) {
        self.broadcast(WsMessage::Heartbeat {
            timestamp: chrono::Utc::now().timestamp(),
        });
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut rx = state.ws_broadcaster().subscribe();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    // Forward broadcast messages to this client
    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    WS_MESSAGES_SENT.with_label_values(&[msg.kind()]).inc();

                    match serde_json::to_string(&msg) {
                        Ok(json) => {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                debug!("WebSocket send failed, client disconnected");
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Failed to serialize WsMessage: {}", e);
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("WebSocket client lagged, skipped {} messages", n);
                    WS_LAG_EVENTS.inc();
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Broadcast channel closed");
                    break;
                }
            }
        }
    });

    // Clients only read; incoming frames are drained until close
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                debug!("Ignoring client text message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}
