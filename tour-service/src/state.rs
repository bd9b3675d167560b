//! Application state management

use std::sync::Arc;

use crate::{
    config::{Config, Environment},
    error::Result,
    store::{MemoryTourStore, TourRepository},
};

/// Application state shared across handlers
///
/// Generic parameter `R` is the tour store. Cloning is cheap: both the
/// configuration and the store are shared.
pub struct AppState<R = MemoryTourStore> {
    config: Arc<Config>,
    store: Arc<R>,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
        }
    }
}

impl<R: TourRepository> AppState<R> {
    /// Create a new AppState owning `store`
    pub fn new(config: Config, store: R) -> Self {
        Self::with_shared_store(config, Arc::new(store))
    }

    /// Create a new AppState around an already shared store
    pub fn with_shared_store(config: Config, store: Arc<R>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the tour store
    pub fn store(&self) -> &R {
        &self.store
    }

    /// Operating mode from the configuration
    pub fn environment(&self) -> Environment {
        self.config.service.environment
    }
}

impl AppState<MemoryTourStore> {
    /// Build state with an in-memory store, seeded when `store.seed_file` is set
    pub async fn from_config(config: Config) -> Result<Self> {
        let store = match &config.store.seed_file {
            Some(path) => MemoryTourStore::from_seed_file(path).await?,
            None => {
                tracing::info!("No seed file configured, starting with an empty store");
                MemoryTourStore::new()
            }
        };
        Ok(Self::new(config, store))
    }
}
