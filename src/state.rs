//! Application state shared across the web handlers.

use crate::places::PlacesService;
use crate::places::cache::ResponseCache;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub places: Arc<PlacesService>,
    /// Same cache instance the service holds; kept here for health probes
    /// and admin purges.
    pub cache: ResponseCache,
    pub admin_token: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(places: Arc<PlacesService>, cache: ResponseCache, admin_token: Option<String>) -> Self {
        Self {
            places,
            cache,
            admin_token,
            started_at: Utc::now(),
        }
    }
}
