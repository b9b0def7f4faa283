//! Application entry point for the `weatherflow` service.
//!
//! This binary orchestrates the startup sequence shared by every subcommand:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Establishing a PostgreSQL connection pool
//! - Creating the database schema if it does not exist
//!
//! and then dispatches to `serve` (read API, optional scheduled ingestion),
//! `ingest` (one pipeline run) or `import-cities`.
//!
//! # Environment Variables
//! See [`weatherflow::config::load_from_env`] for the full list. Logging is
//! controlled by `RUST_LOG` or `LOG_LEVEL` (default: `info`), `LOG_SPAN_EVENTS`
//! and `FORCE_COLOR`.
use std::{env, io::IsTerminal, sync::Arc};

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use weatherflow::{
    config, import, pipeline, routes, schema, Config, IngestionPipeline, OpenWeatherClient,
    PgStore, WeatherSource, WeatherStore,
};

mod cli;

use cli::{Cli, Command};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let cfg = config::load_from_env()?;
    cfg.log_config();

    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.db_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool).await?;

    let store: Arc<dyn WeatherStore> = Arc::new(PgStore::new(pool));
    let shutdown = shutdown_on_ctrl_c();

    match cli.command {
        Command::Serve => serve(cfg, store, shutdown).await,
        Command::Ingest => {
            let source = build_source(&cfg)?;
            let summary = IngestionPipeline::new(source, store, cfg.pipeline_settings())
                .with_shutdown(shutdown)
                .run()
                .await?;
            tracing::info!("Ingestion complete: {:?}", summary);
            Ok(())
        }
        Command::ImportCities { file, overwrite } => {
            import::import_cities(store.as_ref(), &file, overwrite).await?;
            Ok(())
        }
    }
}

async fn serve(cfg: Config, store: Arc<dyn WeatherStore>, shutdown: CancellationToken) -> Result<()> {
    // ---
    if let Some(interval) = cfg.ingest_interval() {
        let source = build_source(&cfg)?;
        let settings = cfg.pipeline_settings();
        let store = Arc::clone(&store);
        let token = shutdown.clone();
        tracing::info!("Scheduling ingestion every {:?}", interval);

        tokio::spawn(async move {
            pipeline::run_periodically(interval, token, move || {
                IngestionPipeline::new(Arc::clone(&source), Arc::clone(&store), settings.clone())
            })
            .await;
        });
    }

    let app = routes::router(store, routes::report_cache(cfg.cache_ttl()));

    tracing::info!("Listening on {}", cfg.bind_addr);

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

fn build_source(cfg: &Config) -> Result<Arc<dyn WeatherSource>> {
    // ---
    let client = OpenWeatherClient::new(
        cfg.api_url.clone(),
        cfg.api_key.clone(),
        cfg.units.clone(),
        cfg.http_timeout(),
    )?;
    Ok(Arc::new(client))
}

/// Cancel the returned token on Ctrl-C.
fn shutdown_on_ctrl_c() -> CancellationToken {
    // ---
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received, shutting down");
            trigger.cancel();
        }
    });
    token
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `LOG_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default), which
///     reports the duration of each `ingestion_run`
/// - Log level controlled by the `LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("LOG_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
