//! Configuration loader for the `weatherflow` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Parsing goes through a key lookup so the rules
//! can be exercised without touching the process environment.
use std::{env, net::SocketAddr, time::Duration};

use anyhow::{anyhow, ensure, Result};

use crate::client::DEFAULT_ENDPOINT;
use crate::pipeline::{PipelineSettings, DEFAULT_FETCH_WORKERS, DEFAULT_PERSIST_WORKERS};
use crate::retry::RetryPolicy;

/// Parse an optional integer variable with a default value.
macro_rules! parse_u32_or {
    ($lookup:expr, $var_name:expr, $default:expr) => {
        parse_u32_opt!($lookup, $var_name).unwrap_or($default)
    };
}

/// Parse an optional integer variable; unset or empty yields `None`.
macro_rules! parse_u32_opt {
    ($lookup:expr, $var_name:expr) => {
        $lookup($var_name)
            .filter(|v: &String| !v.trim().is_empty())
            .map(|v| v.trim().parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
    };
}

/// Parse a required string variable.
macro_rules! require_var {
    ($lookup:expr, $var_name:expr) => {
        $lookup($var_name)
            .filter(|v: &String| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Upstream weather endpoint.
    pub api_url: String,

    /// Upstream API key (`appid`).
    pub api_key: String,

    /// Unit system requested from the upstream (`metric`, `imperial`, `standard`).
    pub units: String,

    /// Language requested from the upstream for descriptions.
    pub lang: String,

    pub fetch_workers: u32,
    pub persist_workers: u32,

    /// Pause before re-issuing a rate-limited fetch.
    pub rate_limit_delay_secs: u32,

    /// Retry cap for rate-limited fetches; `None` retries indefinitely.
    pub rate_limit_max_retries: Option<u32>,

    /// Per-request timeout; `None` keeps the transport default.
    pub http_timeout_secs: Option<u32>,

    /// TTL of the read API's per-city cache.
    pub cache_ttl_secs: u32,

    pub bind_addr: SocketAddr,

    /// Run the ingestion pipeline from `serve` every N seconds.
    pub ingest_interval_secs: Option<u32>,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `OPENWEATHER_API_KEY` – upstream API key
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `OPENWEATHER_URL` – upstream endpoint (default: OpenWeather current weather)
/// - `OPENWEATHER_UNITS` (default: `metric`), `OPENWEATHER_LANG` (default: `en`)
/// - `FETCH_WORKERS` (default: 3), `PERSIST_WORKERS` (default: 5)
/// - `RATE_LIMIT_DELAY_SECS` (default: 60), `RATE_LIMIT_MAX_RETRIES` (default: unlimited)
/// - `HTTP_TIMEOUT_SECS` (default: transport default)
/// - `CACHE_TTL_SECS` (default: 300)
/// - `BIND_ADDR` (default: `0.0.0.0:8080`)
/// - `INGEST_INTERVAL_SECS` (default: no scheduled ingestion)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    load_from(|key| env::var(key).ok())
}

/// Build a [`Config`] from an arbitrary key lookup.
pub fn load_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let db_url = require_var!(lookup, "DATABASE_URL");
    let api_key = require_var!(lookup, "OPENWEATHER_API_KEY");
    let api_url = lookup("OPENWEATHER_URL").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let units = lookup("OPENWEATHER_UNITS").unwrap_or_else(|| "metric".to_string());
    let lang = lookup("OPENWEATHER_LANG").unwrap_or_else(|| "en".to_string());

    let db_pool_max = parse_u32_or!(lookup, "DB_POOL_MAX", 5);
    let fetch_workers = parse_u32_or!(lookup, "FETCH_WORKERS", DEFAULT_FETCH_WORKERS as u32);
    let persist_workers = parse_u32_or!(lookup, "PERSIST_WORKERS", DEFAULT_PERSIST_WORKERS as u32);
    let rate_limit_delay_secs = parse_u32_or!(lookup, "RATE_LIMIT_DELAY_SECS", 60);
    let rate_limit_max_retries = parse_u32_opt!(lookup, "RATE_LIMIT_MAX_RETRIES");
    let http_timeout_secs = parse_u32_opt!(lookup, "HTTP_TIMEOUT_SECS");
    let cache_ttl_secs = parse_u32_or!(lookup, "CACHE_TTL_SECS", 300);
    let ingest_interval_secs = parse_u32_opt!(lookup, "INGEST_INTERVAL_SECS");

    let bind_addr = lookup("BIND_ADDR")
        .unwrap_or_else(|| "0.0.0.0:8080".to_string())
        .parse::<SocketAddr>()
        .map_err(|e| anyhow!("Invalid BIND_ADDR: {}", e))?;

    ensure!(fetch_workers > 0, "FETCH_WORKERS must be at least 1");
    ensure!(persist_workers > 0, "PERSIST_WORKERS must be at least 1");
    ensure!(
        ingest_interval_secs != Some(0),
        "INGEST_INTERVAL_SECS must be greater than 0"
    );

    Ok(Config {
        db_url,
        db_pool_max,
        api_url,
        api_key,
        units,
        lang,
        fetch_workers,
        persist_workers,
        rate_limit_delay_secs,
        rate_limit_max_retries,
        http_timeout_secs,
        cache_ttl_secs,
        bind_addr,
        ingest_interval_secs,
    })
}

impl Config {
    // ---
    pub fn pipeline_settings(&self) -> PipelineSettings {
        // ---
        PipelineSettings {
            fetch_workers: self.fetch_workers as usize,
            persist_workers: self.persist_workers as usize,
            lang: self.lang.clone(),
            retry: RetryPolicy::new(
                Duration::from_secs(u64::from(self.rate_limit_delay_secs)),
                self.rate_limit_max_retries,
            ),
        }
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(|s| Duration::from_secs(u64::from(s)))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.cache_ttl_secs))
    }

    pub fn ingest_interval(&self) -> Option<Duration> {
        self.ingest_interval_secs
            .map(|s| Duration::from_secs(u64::from(s)))
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password and the API key.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL           : {}", mask_db_url(&self.db_url));
        tracing::info!("  DB_POOL_MAX            : {}", self.db_pool_max);
        tracing::info!("  OPENWEATHER_URL        : {}", self.api_url);
        tracing::info!("  OPENWEATHER_API_KEY    : {}", mask_secret(&self.api_key));
        tracing::info!("  OPENWEATHER_UNITS      : {}", self.units);
        tracing::info!("  OPENWEATHER_LANG       : {}", self.lang);
        tracing::info!("  FETCH_WORKERS          : {}", self.fetch_workers);
        tracing::info!("  PERSIST_WORKERS        : {}", self.persist_workers);
        tracing::info!("  RATE_LIMIT_DELAY_SECS  : {}", self.rate_limit_delay_secs);
        tracing::info!("  RATE_LIMIT_MAX_RETRIES : {:?}", self.rate_limit_max_retries);
        tracing::info!("  HTTP_TIMEOUT_SECS      : {:?}", self.http_timeout_secs);
        tracing::info!("  CACHE_TTL_SECS         : {}", self.cache_ttl_secs);
        tracing::info!("  BIND_ADDR              : {}", self.bind_addr);
        tracing::info!("  INGEST_INTERVAL_SECS   : {:?}", self.ingest_interval_secs);
    }
}

fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            // Skip the scheme separator in "postgres://user@host"
            if !db_url[colon_pos..].starts_with("://") {
                return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
            }
        }
    }
    db_url.to_string()
}

fn mask_secret(secret: &str) -> String {
    // ---
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
