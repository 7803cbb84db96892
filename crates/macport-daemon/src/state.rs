//! Shared state for the search API

use macport_core::InventoryStore;
use std::sync::Arc;

pub struct AppState {
    pub store: Arc<InventoryStore>,
    /// Port-name patterns hidden from search results
    pub skip_ports: Vec<String>,
}

impl AppState {
    pub fn new(store: Arc<InventoryStore>, skip_ports: Vec<String>) -> Arc<Self> {
        Arc::new(Self { store, skip_ports })
    }
}
