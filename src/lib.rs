//! Weather ingestion pipeline and read API for a set of tracked cities.
//!
//! The crate is organized around the ingestion path:
//! - `client` – one upstream call per city, classified into a report or a [`FetchError`]
//! - `models` – [`WeatherReport`] and its all-or-nothing payload validation
//! - `breaker` / `retry` – run-scoped circuit breaker and rate-limit retry loop
//! - `queue` / `pipeline` – the two-stage fetch/persist worker pools
//!
//! Around it sit the `store` seam (Postgres via `sqlx`), the `routes` read
//! API (axum), the city list `import`, and environment `config`.

pub mod breaker;
pub mod client;
pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod pipeline;
pub mod queue;
pub mod retry;
pub mod routes;
pub mod schema;
pub mod store;

pub use breaker::CircuitBreaker;
pub use client::{OpenWeatherClient, WeatherSource};
pub use config::Config;
pub use error::FetchError;
pub use models::{City, StoredReading, WeatherReport, WeatherView, WindDirection};
pub use pipeline::{Fetcher, IngestionPipeline, PipelineSettings, RunSummary};
pub use retry::RetryPolicy;
pub use store::{PgStore, WeatherStore};
