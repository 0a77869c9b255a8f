use std::sync::Arc;

use keychain_core::generator::KeychainGenerator;
use keychain_core::layout::StorageLayout;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Cached keychain generator (wraps the CAD kernel).
    pub generator: Arc<KeychainGenerator>,
}

impl AppState {
    pub fn layout(&self) -> &StorageLayout {
        &self.config.layout
    }
}
