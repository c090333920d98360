// src/lib.rs
// Public library surface for the HTTP entrypoint and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod query;
pub mod ranking;
pub mod restaurants;
pub mod review;
pub mod scoring;
pub mod sentiment;
pub mod service;
pub mod stats;
pub mod store;
pub mod top;

pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::error::ApiError;
pub use crate::service::RankingsService;
pub use crate::store::{MemoryStore, Store};

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "restaurant_rankings=info,warn";

/// Install the global tracing subscriber. `LOG_FORMAT=json` switches to
/// structured JSON lines. Safe to call more than once.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("json"));

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    // Already installed (tests, or a host runtime) is fine.
    let _ = res;
}

/// Build the state from config: open the seeded store once for the process.
pub fn build_state(cfg: AppConfig) -> anyhow::Result<AppState> {
    let store = MemoryStore::open(&cfg.store.seed_path)
        .with_context(|| format!("opening store from {}", cfg.store.seed_path.display()))?;
    Ok(AppState::new(Arc::new(store), cfg))
}

/// Load config (file + env), open the store and return the deployable service.
pub async fn service() -> anyhow::Result<RankingsService> {
    let cfg = AppConfig::load_default().context("loading app config")?;
    let state = build_state(cfg)?;
    let restaurants = state.store.find_all().await?.len();
    info!(
        restaurants,
        metrics = state.config.metrics.enabled,
        "restaurant rankings ready"
    );
    Ok(RankingsService {
        store: state.store.clone(),
        router: router(state),
    })
}

/// The full router, as `service()` would serve it.
pub async fn app() -> anyhow::Result<Router> {
    Ok(service().await?.router)
}
