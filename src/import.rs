//! Bulk import of the upstream's published city list.
//!
//! Reads a JSON array of `{ "name", "country", "coord": { "lat", "lon" } }`
//! records and writes each one to the store under its lowercase name.
//!
//! The list is read from a local file in the upstream's `city.list.json`
//! format. Downloading and reading the spreadsheet-based city catalogue is
//! not supported; fetch or convert the list first.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{City, WeatherStore};

// ---

#[derive(Debug, Deserialize)]
struct CityRecord {
    name: String,
    #[serde(default)]
    country: String,
    coord: Coord,
}

#[derive(Debug, Deserialize)]
struct Coord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub read: usize,
    pub written: usize,
    pub duplicates: usize,
}

/// Parse a city list into [`City`] rows, active by default. The first
/// occurrence of a (case-insensitive) name wins.
pub fn parse_city_list(json: &str) -> Result<(Vec<City>, usize)> {
    // ---
    let records: Vec<CityRecord> =
        serde_json::from_str(json).context("Failed to parse city list JSON")?;

    let mut seen = HashSet::new();
    let mut duplicates = 0;
    let mut cities = Vec::with_capacity(records.len());

    for r in records {
        let name = r.name.trim().to_lowercase();
        if name.is_empty() {
            continue;
        }
        if !seen.insert(name.clone()) {
            duplicates += 1;
            continue;
        }
        cities.push(City {
            name,
            country: r.country,
            latitude: r.coord.lat,
            longitude: r.coord.lon,
            active: true,
            last_update: None,
        });
    }

    Ok((cities, duplicates))
}

/// Load `path` and upsert every city into `store`. Existing rows are left
/// alone unless `overwrite` is set.
pub async fn import_cities(
    store: &dyn WeatherStore,
    path: &Path,
    overwrite: bool,
) -> Result<ImportSummary> {
    // ---
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read city list: {}", path.display()))?;

    let (cities, duplicates) = parse_city_list(&raw)?;
    info!("Importing {} cities from {}", cities.len(), path.display());

    let mut written = 0;
    for city in &cities {
        if store.upsert_city(city, overwrite).await? {
            written += 1;
        } else {
            debug!("Kept existing city '{}'", city.name);
        }
    }

    let summary = ImportSummary {
        read: cities.len(),
        written,
        duplicates,
    };
    info!("City import complete: {:?}", summary);
    Ok(summary)
}
