//! Data models for the weather pipeline.
//!
//! [`WeatherReport`] is the artifact produced by the fetch stage. It is built
//! from a raw upstream payload by [`WeatherReport::from_response`], which is
//! all-or-nothing: either every required key is present and well-typed or
//! the whole parse fails with [`FetchError::InvalidResponse`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::FetchError;

// ---

/// A tracked city as held by the store. Names are the lowercase key.
#[derive(Debug, Clone, PartialEq)]
pub struct City {
    // ---
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub active: bool,
    pub last_update: Option<DateTime<Utc>>,
}

/// Cardinal wind direction.
///
/// Bearings are mapped onto four symmetric 90° sectors centred on the
/// cardinal points. Lower bounds are inclusive, upper bounds exclusive:
///
/// | direction | bearing                  |
/// |-----------|--------------------------|
/// | North     | `[315, 360)` ∪ `[0, 45)` |
/// | East      | `[45, 135)`              |
/// | South     | `[135, 225)`             |
/// | West      | `[225, 315)`             |
///
/// Anything outside `[0, 360)`, or a missing bearing, is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindDirection {
    North,
    East,
    South,
    West,
    Unknown,
}

impl WindDirection {
    // ---
    pub fn from_degrees(degrees: f64) -> Self {
        // ---
        if !(0.0..360.0).contains(&degrees) {
            return WindDirection::Unknown;
        }
        match degrees {
            d if d < 45.0 => WindDirection::North,
            d if d < 135.0 => WindDirection::East,
            d if d < 225.0 => WindDirection::South,
            d if d < 315.0 => WindDirection::West,
            _ => WindDirection::North,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WindDirection::North => "North",
            WindDirection::East => "East",
            WindDirection::South => "South",
            WindDirection::West => "West",
            WindDirection::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for WindDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated weather reading for one city, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    // ---
    pub city: String,
    pub temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub humidity: Option<u8>,
    pub pressure: Option<i32>,
    pub wind_speed: Option<f64>,
    pub wind_degree: Option<f64>,
    pub wind_direction: WindDirection,
    pub description: Option<String>,
}

/// `main` block of the upstream payload. Sub-fields are optional; a field
/// that is present with the wrong type still fails the parse.
#[derive(Debug, Deserialize)]
struct RawMain {
    temp: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    humidity: Option<u8>,
    pressure: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RawWind {
    speed: Option<f64>,
    deg: Option<f64>,
}

impl WeatherReport {
    // ---
    /// Parse a raw upstream payload into a report.
    ///
    /// Requires the top-level `name` string plus `main` and `wind` objects.
    /// Missing sub-fields become `None`; `weather[0].description` is optional.
    pub fn from_response(raw: &Value) -> Result<Self, FetchError> {
        // ---
        let obj = raw
            .as_object()
            .ok_or_else(|| invalid("payload is not a JSON object"))?;

        let city = match obj.get("name") {
            Some(Value::String(name)) => name.clone(),
            Some(_) => return Err(invalid("'name' is not a string")),
            None => return Err(invalid("missing 'name'")),
        };

        let main: RawMain = typed_object(obj, "main")?;
        let wind: RawWind = typed_object(obj, "wind")?;

        if let Some(h) = main.humidity {
            if h > 100 {
                return Err(invalid(&format!("humidity {h} out of range 0-100")));
            }
        }

        let description = obj
            .get("weather")
            .and_then(Value::as_array)
            .and_then(|entries| entries.first())
            .and_then(|w| w.get("description"))
            .and_then(Value::as_str)
            .map(String::from);

        let wind_direction = wind
            .deg
            .map_or(WindDirection::Unknown, WindDirection::from_degrees);

        Ok(WeatherReport {
            city,
            temperature: main.temp,
            min_temperature: main.temp_min,
            max_temperature: main.temp_max,
            humidity: main.humidity,
            pressure: main.pressure,
            wind_speed: wind.speed,
            wind_degree: wind.deg,
            wind_direction,
            description,
        })
    }
}

fn invalid(reason: &str) -> FetchError {
    FetchError::InvalidResponse(reason.to_string())
}

/// Fetch `key` from `obj`, require it to be a JSON object, then deserialize it.
fn typed_object<T>(obj: &Map<String, Value>, key: &str) -> Result<T, FetchError>
where
    T: serde::de::DeserializeOwned,
{
    // ---
    match obj.get(key) {
        Some(value) if value.is_object() => serde_json::from_value(value.clone())
            .map_err(|e| invalid(&format!("malformed '{key}': {e}"))),
        Some(_) => Err(invalid(&format!("'{key}' is not an object"))),
        None => Err(invalid(&format!("missing '{key}'"))),
    }
}

/// A persisted reading, as returned by the store's latest-by-city lookup.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredReading {
    // ---
    pub city: String,
    pub temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub humidity: Option<i16>,
    pub pressure: Option<i32>,
    pub wind_speed: Option<f64>,
    pub wind_degree: Option<f64>,
    pub wind_direction: String,
    pub description: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl StoredReading {
    // ---
    pub fn from_report(report: &WeatherReport, recorded_at: DateTime<Utc>) -> Self {
        // ---
        StoredReading {
            city: report.city.to_lowercase(),
            temperature: report.temperature,
            min_temperature: report.min_temperature,
            max_temperature: report.max_temperature,
            humidity: report.humidity.map(i16::from),
            pressure: report.pressure,
            wind_speed: report.wind_speed,
            wind_degree: report.wind_degree,
            wind_direction: report.wind_direction.to_string(),
            description: report.description.clone(),
            recorded_at,
        }
    }
}

/// Shape served by the read API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherView {
    // ---
    pub city: String,
    pub temperature: TemperatureView,
    pub humidity: Option<i16>,
    pub pressure: Option<i32>,
    pub wind: WindView,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureView {
    pub current: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindView {
    pub speed: Option<f64>,
    pub direction: String,
}

impl From<StoredReading> for WeatherView {
    // ---
    fn from(r: StoredReading) -> Self {
        WeatherView {
            city: r.city,
            temperature: TemperatureView {
                current: r.temperature,
                minimum: r.min_temperature,
                maximum: r.max_temperature,
            },
            humidity: r.humidity,
            pressure: r.pressure,
            wind: WindView {
                speed: r.wind_speed,
                direction: r.wind_direction,
            },
            description: r.description,
            updated_at: r.recorded_at,
        }
    }
}
