use std::sync::Arc;

use l10n_core::{Config, SettingsStore, StatsService};

use crate::api::WsBroadcaster;
use crate::session::Session;

/// Shared application state
pub struct AppState {
    config: Config,
    session: Arc<Session>,
    settings: Arc<SettingsStore>,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    pub fn new(
        config: Config,
        session: Arc<Session>,
        settings: Arc<SettingsStore>,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        Self {
            config,
            session,
            settings,
            ws_broadcaster,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Session {
        self.session.as_ref()
    }

    pub fn service(&self) -> &StatsService {
        self.session.service().as_ref()
    }

    pub fn settings(&self) -> &SettingsStore {
        self.settings.as_ref()
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }
}
