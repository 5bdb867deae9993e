//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{GameRules, RoomRegistry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub room_registry: Arc<RoomRegistry>,
}

impl AppState {
    pub fn new(config: Config, rules: GameRules) -> Self {
        let config = Arc::new(config);

        // Rooms are created lazily on first join
        let room_registry = Arc::new(RoomRegistry::new(Arc::new(rules), config.room_idle_timeout));

        Self {
            config,
            room_registry,
        }
    }
}
