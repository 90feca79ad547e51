use std::sync::Arc;

use pronto_core::{Config, OrderStore};

/// Shared application state
pub struct AppState {
    config: Config,
    order_store: Arc<dyn OrderStore>,
}

impl AppState {
    pub fn new(config: Config, order_store: Arc<dyn OrderStore>) -> Self {
        Self {
            config,
            order_store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn order_store(&self) -> &dyn OrderStore {
        self.order_store.as_ref()
    }
}
