pub mod aggregate;
pub mod cache;
pub mod config;
pub mod export;
pub mod fetcher;
pub mod metrics;
pub mod paginator;
pub mod parser;
pub mod paths;
pub mod service;
pub mod settings;
pub mod stats;
pub mod testing;

pub use aggregate::{HeatLevel, Rollup, SortKey};
pub use cache::{CacheError, CachedStats, JsonFileCache, StatsCache};
pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
};
pub use export::{export, ExportError, ExportFormat};
pub use fetcher::{FetchError, HttpResponse, PageFetcher, ReqwestTransport, RetryPolicy, Transport};
pub use paginator::{Paginator, PaginatorConfig};
pub use paths::{AppPaths, PathError};
pub use service::{FetchEvent, FetchWorker, StatsError, StatsService};
pub use settings::{Settings, SettingsError, SettingsPatch, SettingsStore};
pub use stats::{FetchProgress, FetchResult, PackageStat, StatsKey, StatsKeyError};
