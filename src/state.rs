use std::time::Instant;

use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::repositories::session::SessionRegistry;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// The in-memory chip session registry.
    pub registry: SessionRegistry,
    /// Fan-out of lifecycle events to realtime clients.
    pub broadcaster: Broadcaster,
    /// When the process started serving.
    pub started_at: Instant,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    pub fn new(config: &Config) -> Self {
        let registry = SessionRegistry::new();
        tracing::info!("✅ Session registry initialized");

        let broadcaster = Broadcaster::new();
        tracing::info!("✅ Event broadcaster initialized");

        AppState {
            config: config.clone(),
            registry,
            broadcaster,
            started_at: Instant::now(),
        }
    }
}
