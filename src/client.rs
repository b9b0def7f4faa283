//! Upstream weather source client.
//!
//! One outbound `GET` per call, classified into a [`WeatherReport`] or a
//! [`FetchError`]. The client never retries; that belongs to
//! [`RetryPolicy`](crate::RetryPolicy).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::{FetchError, WeatherReport};

// ---

pub const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Anything that can produce a report for a city name.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    // ---
    async fn fetch(&self, city: &str, lang: &str) -> Result<WeatherReport, FetchError>;
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    // ---
    http: Client,
    endpoint: String,
    api_key: String,
    units: String,
}

impl OpenWeatherClient {
    // ---
    /// Build a client against `endpoint`. `timeout` of `None` keeps the
    /// transport default.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        units: impl Into<String>,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Self> {
        // ---
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            units: units.into(),
        })
    }

    /// Look up the weather at a coordinate pair instead of a city name.
    pub async fn fetch_by_coordinates(
        &self,
        lat: f64,
        lon: f64,
        lang: &str,
    ) -> Result<WeatherReport, FetchError> {
        // ---
        let (lat, lon) = (lat.to_string(), lon.to_string());
        self.request(&[("lat", lat.as_str()), ("lon", lon.as_str()), ("lang", lang)])
            .await
    }

    async fn request(&self, params: &[(&str, &str)]) -> Result<WeatherReport, FetchError> {
        // ---
        let res = self
            .http
            .get(&self.endpoint)
            .query(params)
            .query(&[("units", self.units.as_str()), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        debug!("Upstream responded {} for {:?}", status, params);

        match status {
            StatusCode::OK => {
                // Transport failures while reading the body stay `Unexpected`.
                let bytes = res.bytes().await?;
                let body: serde_json::Value = serde_json::from_slice(&bytes)
                    .map_err(|e| FetchError::InvalidResponse(format!("body is not JSON: {e}")))?;
                WeatherReport::from_response(&body)
            }
            other => Err(classify_status(other)),
        }
    }
}

/// Map a non-200 status onto the error taxonomy.
pub fn classify_status(status: StatusCode) -> FetchError {
    // ---
    match status {
        StatusCode::UNAUTHORIZED => FetchError::Unauthorized,
        StatusCode::NOT_FOUND => FetchError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => FetchError::TooManyRequests,
        other => FetchError::Unexpected(format!("upstream returned status {other}")),
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    // ---
    async fn fetch(&self, city: &str, lang: &str) -> Result<WeatherReport, FetchError> {
        self.request(&[("q", city), ("lang", lang)]).await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_status_classification() {
        // ---
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), FetchError::Unauthorized);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), FetchError::NotFound);
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            FetchError::TooManyRequests
        );
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            FetchError::Unexpected(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN),
            FetchError::Unexpected(_)
        ));
    }
}
