use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use l10n_core::{
    load_config, load_default_config, validate_config, AppPaths, FetchWorker, JsonFileCache,
    SettingsStore, StatsCache, StatsService,
};
use l10n_server::{create_router, AppState, Session, WsBroadcaster};

/// Buffer size for background fetch events
const FETCH_EVENT_BUFFER_SIZE: usize = 256;

/// Interval between WebSocket heartbeats
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("UBUNTU_L10N_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration, falling back to built-in defaults when the file is absent
    let config = if config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        info!("No config file at {:?}, using defaults", config_path);
        load_default_config().context("Failed to load default config")?
    };

    validate_config(&config).context("Configuration validation failed")?;

    let paths = AppPaths::resolve(&config).context("Failed to resolve data directories")?;
    info!("Cache path: {:?}", paths.cache_file);
    info!("Settings path: {:?}", paths.settings_file);
    info!("Upstream: {}", config.upstream.base_url);

    // Statistics pipeline
    let cache: Arc<dyn StatsCache> = Arc::new(JsonFileCache::new(&paths.cache_file));
    let service = Arc::new(
        StatsService::from_config(&config, cache).context("Failed to create HTTP client")?,
    );
    let settings = Arc::new(SettingsStore::new(&paths.settings_file));

    // WebSocket broadcaster for live updates
    let ws_broadcaster = WsBroadcaster::default();

    // Background fetch worker and the session consuming its events
    let (worker, events) = FetchWorker::channel(service, FETCH_EVENT_BUFFER_SIZE);
    let session = Session::start(
        worker,
        events,
        ws_broadcaster.clone(),
        Arc::clone(&settings),
    );
    info!("Fetch worker started");

    let heartbeat = {
        let broadcaster = ws_broadcaster.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                interval.tick().await;
                broadcaster.heartbeat();
            }
        })
    };

    let state = Arc::new(AppState::new(
        config.clone(),
        session,
        settings,
        ws_broadcaster,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    heartbeat.abort();
    info!("Server shutting down...");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
