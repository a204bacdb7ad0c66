//! Shared application state.

use std::sync::Arc;

use crate::bootstrap::BootstrapCoordinator;

/// Shared application state.
pub struct AppState {
    /// Join/Auth coordinator.
    pub bootstrap: BootstrapCoordinator,

    /// Whether the bootstrap routes are mounted.
    pub bootstrap_enabled: bool,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(bootstrap: BootstrapCoordinator, bootstrap_enabled: bool) -> Arc<Self> {
        Arc::new(Self {
            bootstrap,
            bootstrap_enabled,
        })
    }
}
