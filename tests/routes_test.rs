//! Read API tests against an ephemeral server.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use common::{report, MemoryStore};
use weatherflow::{routes, StoredReading, WeatherStore};

async fn spawn_app(store: Arc<MemoryStore>) -> Result<String> {
    // ---
    let store: Arc<dyn WeatherStore> = store;
    let app = routes::router(store, routes::report_cache(Duration::from_secs(60)));

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(format!("http://{addr}"))
}

fn seeded_store() -> Arc<MemoryStore> {
    // ---
    let store = MemoryStore::default();
    let at = Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, 0).unwrap();
    store.push_reading(StoredReading::from_report(&report("TestCity"), at));
    Arc::new(store)
}

#[tokio::test]
async fn weather_returns_latest_reading() -> Result<()> {
    // ---
    let base = spawn_app(seeded_store()).await?;

    let res = Client::new()
        .get(format!("{base}/weather?city=TestCity"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["city"], "testcity");
    assert_eq!(body["data"]["temperature"]["current"], 298.48);
    assert_eq!(body["data"]["temperature"]["minimum"], 297.56);
    assert_eq!(body["data"]["temperature"]["maximum"], 300.05);
    assert_eq!(body["data"]["humidity"], 64);
    assert_eq!(body["data"]["pressure"], 1015);
    assert_eq!(body["data"]["wind"]["speed"], 0.62);
    assert_eq!(body["data"]["wind"]["direction"], "North");
    assert_eq!(body["data"]["description"], "clear sky");
    Ok(())
}

#[tokio::test]
async fn weather_without_city_is_bad_request() -> Result<()> {
    // ---
    let base = spawn_app(seeded_store()).await?;
    let client = Client::new();

    let res = client.get(format!("{base}/weather")).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Bad Request: No city provided.");

    let res = client
        .get(format!("{base}/weather?city="))
        .header("Accept-Language", "de")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Schlechte Anfrage: Keine Stadt angegeben.");
    Ok(())
}

#[tokio::test]
async fn unknown_city_is_not_found() -> Result<()> {
    // ---
    let base = spawn_app(seeded_store()).await?;

    let res = Client::new()
        .get(format!("{base}/weather?city=NoCity"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let body: Value = res.json().await?;
    assert_eq!(body["status"], "error");
    assert_eq!(
        body["message"],
        "Not Found: No city found with the provided query."
    );
    Ok(())
}

#[tokio::test]
async fn store_failure_is_service_unavailable() -> Result<()> {
    // ---
    let base = spawn_app(Arc::new(MemoryStore::default().failing_reads())).await?;

    let res = Client::new()
        .get(format!("{base}/weather?city=london"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn repeated_reads_are_served_from_cache() -> Result<()> {
    // ---
    let store = seeded_store();
    let base = spawn_app(store.clone()).await?;
    let client = Client::new();
    let url = format!("{base}/weather?city=testcity");

    let first: Value = client.get(&url).send().await?.json().await?;

    // A newer reading lands in the store, but the cached view is still fresh.
    let mut newer = StoredReading::from_report(&report("TestCity"), Utc::now());
    newer.temperature = Some(250.0);
    store.push_reading(newer);

    let second: Value = client.get(&url).send().await?.json().await?;
    assert_eq!(first, second);
    assert_eq!(second["data"]["temperature"]["current"], 298.48);
    Ok(())
}

#[tokio::test]
async fn health_is_ok() -> Result<()> {
    // ---
    let base = spawn_app(Arc::new(MemoryStore::default())).await?;

    let body: Value = Client::new()
        .get(format!("{base}/health"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}
