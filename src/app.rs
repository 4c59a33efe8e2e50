//! Application bootstrap: configuration, cache store selection, remote
//! client construction, and the HTTP server lifecycle.

use crate::config::Config;
use crate::places::cache::{KeyValueStore, MemoryStore, NullStore, RedisStore, ResponseCache};
use crate::places::{GooglePlacesClient, PlacesService};
use crate::state::AppState;
use crate::web;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    state: AppState,
}

impl App {
    /// Create a new App instance with all necessary components initialized
    pub async fn new() -> Result<Self, anyhow::Error> {
        let config = Config::load().context("Failed to load config")?;

        let store = Self::select_store(&config).await;
        info!(
            backend = store.backend(),
            ttl_secs = config.cache_ttl_secs,
            "cache store ready"
        );
        let cache = ResponseCache::new(store, Duration::from_secs(config.cache_ttl_secs));

        let client =
            GooglePlacesClient::new(&config.places_base_url, config.google_places_api_key.clone())
                .context("Failed to create Places client")?;

        let service = Arc::new(PlacesService::new(Arc::new(client), cache.clone()));
        let state = AppState::new(service, cache, config.admin_token.clone());

        Ok(App { config, state })
    }

    /// Pick the cache backend from configuration.
    ///
    /// A configured-but-unreachable Redis degrades to the no-op store with a
    /// warning instead of aborting startup: every request becomes a live
    /// lookup, but the service stays up.
    async fn select_store(config: &Config) -> Arc<dyn KeyValueStore> {
        match config.redis_url.as_deref() {
            Some(url) => match RedisStore::connect(url).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(error = %e, "Redis unreachable, degrading to uncached operation");
                    Arc::new(NullStore)
                }
            },
            None => {
                info!("REDIS_URL not set, using in-process cache");
                Arc::new(MemoryStore::new())
            }
        }
    }

    /// Serve the HTTP API until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(%addr, "web server listening");

        let router = web::router(self.state);
        let drain_timeout = Duration::from_secs(self.config.shutdown_timeout);
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal(drain_timeout))
            .await
            .context("web server exited with error")?;

        info!("shutdown complete");
        Ok(())
    }
}

/// Resolve when SIGINT or SIGTERM arrives, then arm a drain watchdog so a
/// hung connection cannot hold the process open past the configured timeout.
async fn shutdown_signal(drain_timeout: Duration) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(
        timeout = crate::utils::fmt_duration(drain_timeout),
        "shutdown signal received, draining"
    );
    tokio::spawn(async move {
        tokio::time::sleep(drain_timeout).await;
        warn!("drain timeout exceeded, exiting");
        std::process::exit(1);
    });
}
