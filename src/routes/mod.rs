//! HTTP read API gateway.
//!
//! Sibling modules each export a subrouter; this gateway merges them and
//! attaches the shared state so `main.rs` only sees [`router`].

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use moka::future::Cache;

use crate::{WeatherStore, WeatherView};

mod health;
mod messages;
mod weather;

pub use messages::Lang;

// ---

/// Latest-reading cache keyed by lowercase city name.
pub type ReportCache = Cache<String, WeatherView>;

pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

pub fn report_cache(ttl: Duration) -> ReportCache {
    // ---
    Cache::builder()
        .max_capacity(DEFAULT_CACHE_CAPACITY)
        .time_to_live(ttl)
        .build()
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn WeatherStore>,
    pub cache: ReportCache,
}

pub fn router(store: Arc<dyn WeatherStore>, cache: ReportCache) -> Router {
    // ---
    Router::new()
        .merge(weather::router())
        .merge(health::router())
        .with_state(AppState { store, cache })
}
