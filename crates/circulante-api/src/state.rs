use std::sync::Arc;

use circulante_core::{DataSource, OlindaClient, Result, Settings};

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    source: Arc<dyn DataSource>,
}

impl AppState {
    pub fn new(settings: Settings, source: Arc<dyn DataSource>) -> Self {
        Self {
            settings: Arc::new(settings),
            source,
        }
    }

    /// State backed by the live Olinda endpoints named in `settings`.
    pub fn connect(settings: Settings) -> Result<Self> {
        let client = OlindaClient::new(&settings)?;
        Ok(Self::new(settings, Arc::new(client)))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn source(&self) -> &dyn DataSource {
        self.source.as_ref()
    }
}
