//! Persistence seam for cities and weather readings.
//!
//! The pipeline and the read API only talk to [`WeatherStore`]; [`PgStore`]
//! is the Postgres implementation used by the binary.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::{City, StoredReading, WeatherReport};

// ---

#[async_trait]
pub trait WeatherStore: Send + Sync {
    // ---
    /// Names of all cities flagged active, lowercase.
    async fn list_active_cities(&self) -> Result<Vec<String>>;

    /// Append a reading for the report's city.
    async fn save_report(&self, report: &WeatherReport) -> Result<()>;

    async fn latest_for_city(&self, city: &str) -> Result<Option<StoredReading>>;

    /// Insert `city`, or overwrite its metadata if `overwrite` is set.
    /// Returns `true` if a row was written.
    async fn upsert_city(&self, city: &City, overwrite: bool) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WeatherStore for PgStore {
    // ---
    async fn list_active_cities(&self) -> Result<Vec<String>> {
        // ---
        let names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM cities WHERE active ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .context("Failed to list active cities")?;
        Ok(names)
    }

    async fn save_report(&self, report: &WeatherReport) -> Result<()> {
        // ---
        let reading = StoredReading::from_report(report, Utc::now());
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO weather_data (
                city, temperature, min_temperature, max_temperature,
                humidity, pressure, wind_speed, wind_degree,
                wind_direction, description, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&reading.city)
        .bind(reading.temperature)
        .bind(reading.min_temperature)
        .bind(reading.max_temperature)
        .bind(reading.humidity)
        .bind(reading.pressure)
        .bind(reading.wind_speed)
        .bind(reading.wind_degree)
        .bind(&reading.wind_direction)
        .bind(&reading.description)
        .bind(reading.recorded_at)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert reading for '{}'", reading.city))?;

        sqlx::query("UPDATE cities SET last_update = $2 WHERE name = $1")
            .bind(&reading.city)
            .bind(reading.recorded_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn latest_for_city(&self, city: &str) -> Result<Option<StoredReading>> {
        // ---
        let row = sqlx::query_as::<_, StoredReading>(
            r#"
            SELECT city, temperature, min_temperature, max_temperature,
                   humidity, pressure, wind_speed, wind_degree,
                   wind_direction, description, recorded_at
            FROM weather_data
            WHERE city = $1
            ORDER BY recorded_at DESC
            LIMIT 1
            "#,
        )
        .bind(city.to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load latest reading for '{city}'"))?;
        Ok(row)
    }

    async fn upsert_city(&self, city: &City, overwrite: bool) -> Result<bool> {
        // ---
        let sql = if overwrite {
            r#"
            INSERT INTO cities (name, country, latitude, longitude, active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO UPDATE SET
                country   = EXCLUDED.country,
                latitude  = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude
            "#
        } else {
            r#"
            INSERT INTO cities (name, country, latitude, longitude, active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO NOTHING
            "#
        };

        let result = sqlx::query(sql)
            .bind(city.name.to_lowercase())
            .bind(&city.country)
            .bind(city.latitude)
            .bind(city.longitude)
            .bind(city.active)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to upsert city '{}'", city.name))?;

        Ok(result.rows_affected() > 0)
    }
}
