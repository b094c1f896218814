//! Application state: configuration and the bank store.
//!
//! Nothing here is mutable after startup. Each request loads its own bank and
//! owns its own random generator, so handlers share no writable state.

use tracing::{info, instrument, warn};

use crate::bank::BankStore;
use crate::config::{load_config_from_env, AppConfig};

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub store: BankStore,
}

impl AppState {
    /// Build state from env: load config, point the store at the banks directory.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let state = Self::with_config(load_config_from_env());

        let books = state.store.list_books();
        if books.is_empty() {
            warn!(target: "pattern_worksheets", dir = %state.store.root().display(), "No question banks found");
        } else {
            info!(target: "pattern_worksheets", dir = %state.store.root().display(), books = books.len(), "Startup bank inventory");
        }
        match &state.config.unicode_font {
            Some(path) if path.is_file() => {
                info!(target: "pattern_worksheets", font = %path.display(), "Unicode font available")
            }
            _ => warn!(target: "pattern_worksheets", "Unicode font unavailable; worksheets use Helvetica only"),
        }
        state
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = BankStore::new(config.databases_dir.clone());
        Self { config, store }
    }
}
