//! City list import against the in-memory store.

mod common;

use std::io::Write;

use anyhow::Result;

use common::MemoryStore;
use weatherflow::import::{import_cities, ImportSummary};

const CITY_LIST: &str = r#"[
    {"id": 2643743, "name": "London", "country": "GB", "coord": {"lat": 51.5085, "lon": -0.1257}},
    {"id": 703448, "name": "Kyiv", "country": "UA", "coord": {"lat": 50.4333, "lon": 30.5167}},
    {"id": 6058560, "name": "London", "country": "CA", "coord": {"lat": 42.9834, "lon": -81.233}}
]"#;

fn city_file(contents: &str) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    Ok(file)
}

#[tokio::test]
async fn imports_new_cities_as_active() -> Result<()> {
    // ---
    let store = MemoryStore::default();
    let file = city_file(CITY_LIST)?;

    let summary = import_cities(&store, file.path(), false).await?;

    assert_eq!(
        summary,
        ImportSummary {
            read: 2,
            written: 2,
            duplicates: 1
        }
    );
    let london = store.city("london").expect("london imported");
    assert_eq!(london.country, "GB");
    assert!(london.active);
    Ok(())
}

#[tokio::test]
async fn existing_cities_only_change_with_override() -> Result<()> {
    // ---
    let store = MemoryStore::with_active(&["london"]);
    let file = city_file(CITY_LIST)?;

    let summary = import_cities(&store, file.path(), false).await?;
    assert_eq!(summary.written, 1);
    assert_eq!(store.city("london").unwrap().country, "XX");

    let summary = import_cities(&store, file.path(), true).await?;
    assert_eq!(summary.written, 2);
    assert_eq!(store.city("london").unwrap().country, "GB");
    Ok(())
}

#[tokio::test]
async fn missing_file_is_an_error() {
    // ---
    let store = MemoryStore::default();
    let result = import_cities(&store, std::path::Path::new("/nonexistent/city.list.json"), false).await;
    assert!(result.is_err());
}
