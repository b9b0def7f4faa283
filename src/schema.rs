//! Database schema management for `weatherflow`.
//!
//! Ensures required tables and indexes exist before serving requests or
//! running ingestion. Applied once on startup from `main.rs`.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `cities` reference table and the append-only `weather_data`
/// table. Safe to call on every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Tracked cities; only `active` rows are ingested
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cities (
            name        TEXT PRIMARY KEY,
            country     TEXT             NOT NULL,
            latitude    DOUBLE PRECISION NOT NULL,
            longitude   DOUBLE PRECISION NOT NULL,
            active      BOOLEAN          NOT NULL DEFAULT TRUE,
            last_update TIMESTAMPTZ
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // One row per ingested reading, served by `/weather`
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weather_data (
            id              BIGSERIAL PRIMARY KEY,
            city            TEXT             NOT NULL,
            temperature     DOUBLE PRECISION,
            min_temperature DOUBLE PRECISION,
            max_temperature DOUBLE PRECISION,
            humidity        SMALLINT,
            pressure        INTEGER,
            wind_speed      DOUBLE PRECISION,
            wind_degree     DOUBLE PRECISION,
            wind_direction  TEXT             NOT NULL,
            description     TEXT,
            recorded_at     TIMESTAMPTZ      NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_weather_data_city_recorded_at
            ON weather_data (city, recorded_at DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_cities_active
            ON cities (active);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
