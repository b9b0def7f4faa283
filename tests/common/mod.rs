//! Shared fakes for the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use weatherflow::{City, FetchError, StoredReading, WeatherReport, WeatherSource, WeatherStore};

// ---

/// Upstream-shaped payload for `city`.
pub fn payload(city: &str, deg: f64) -> Value {
    json!({
        "name": city,
        "main": {
            "temp": 298.48,
            "temp_min": 297.56,
            "temp_max": 300.05,
            "humidity": 64,
            "pressure": 1015
        },
        "wind": { "speed": 0.62, "deg": deg },
        "weather": [{ "description": "clear sky" }]
    })
}

pub fn report(city: &str) -> WeatherReport {
    WeatherReport::from_response(&payload(city, 10.0)).unwrap()
}

/// A source that replays a per-city script of outcomes and records every call.
/// Cities without a script (or with an exhausted one) answer `NotFound`.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Result<WeatherReport, FetchError>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, city: &str, outcomes: Vec<Result<WeatherReport, FetchError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(city.to_string(), outcomes.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, city: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == city).count()
    }
}

#[async_trait]
impl WeatherSource for ScriptedSource {
    async fn fetch(&self, city: &str, _lang: &str) -> Result<WeatherReport, FetchError> {
        self.calls.lock().unwrap().push(city.to_string());
        self.scripts
            .lock()
            .unwrap()
            .get_mut(city)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Err(FetchError::NotFound))
    }
}

/// In-memory store with switchable failures.
#[derive(Default)]
pub struct MemoryStore {
    cities: Mutex<Vec<City>>,
    readings: Mutex<Vec<StoredReading>>,
    failing_saves: HashSet<String>,
    fail_reads: bool,
}

impl MemoryStore {
    pub fn with_active(names: &[&str]) -> Self {
        let store = Self::default();
        {
            let mut cities = store.cities.lock().unwrap();
            for name in names {
                cities.push(city(name, true));
            }
        }
        store
    }

    pub fn with_inactive(self, name: &str) -> Self {
        self.cities.lock().unwrap().push(city(name, false));
        self
    }

    pub fn failing_saves_for(mut self, city: &str) -> Self {
        self.failing_saves.insert(city.to_lowercase());
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn push_reading(&self, reading: StoredReading) {
        self.readings.lock().unwrap().push(reading);
    }

    pub fn saved_cities(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .readings
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.city.clone())
            .collect();
        names.sort();
        names
    }

    pub fn city(&self, name: &str) -> Option<City> {
        self.cities.lock().unwrap().iter().find(|c| c.name == name).cloned()
    }
}

fn city(name: &str, active: bool) -> City {
    City {
        name: name.to_lowercase(),
        country: "XX".to_string(),
        latitude: 0.0,
        longitude: 0.0,
        active,
        last_update: None,
    }
}

#[async_trait]
impl WeatherStore for MemoryStore {
    async fn list_active_cities(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .cities
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.active)
            .map(|c| c.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn save_report(&self, report: &WeatherReport) -> Result<()> {
        let key = report.city.to_lowercase();
        if self.failing_saves.contains(&key) {
            return Err(anyhow!("disk full while saving '{key}'"));
        }
        self.readings
            .lock()
            .unwrap()
            .push(StoredReading::from_report(report, Utc::now()));
        Ok(())
    }

    async fn latest_for_city(&self, city: &str) -> Result<Option<StoredReading>> {
        if self.fail_reads {
            return Err(anyhow!("connection reset"));
        }
        let key = city.to_lowercase();
        Ok(self
            .readings
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.city == key)
            .max_by_key(|r| r.recorded_at)
            .cloned())
    }

    async fn upsert_city(&self, new: &City, overwrite: bool) -> Result<bool> {
        let mut cities = self.cities.lock().unwrap();
        match cities.iter_mut().find(|c| c.name == new.name) {
            Some(existing) if overwrite => {
                existing.country = new.country.clone();
                existing.latitude = new.latitude;
                existing.longitude = new.longitude;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                cities.push(new.clone());
                Ok(true)
            }
        }
    }
}
