//! Error taxonomy for the upstream fetch path.
//!
//! Transport/classification failures (`Unauthorized`, `NotFound`,
//! `TooManyRequests`, `Unexpected`) come from the HTTP exchange itself;
//! `InvalidResponse` is raised when a `200 OK` body does not have the
//! shape a [`WeatherReport`](crate::WeatherReport) needs.

use thiserror::Error;

// ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    // ---
    #[error("unauthorized: please provide a valid access token")]
    Unauthorized,

    #[error("not found: no report found for the query")]
    NotFound,

    #[error("too many requests: upstream rate limit reached")]
    TooManyRequests,

    #[error("unexpected upstream failure: {0}")]
    Unexpected(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    // ---
    /// Systemic failures that must stop all further upstream calls for the run.
    pub fn trips_breaker(&self) -> bool {
        matches!(self, FetchError::Unauthorized | FetchError::Unexpected(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::TooManyRequests)
    }
}

impl From<reqwest::Error> for FetchError {
    // ---
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Unexpected(format!("request timed out: {e}"))
        } else if e.is_connect() {
            FetchError::Unexpected(format!("connection failed: {e}"))
        } else {
            FetchError::Unexpected(e.to_string())
        }
    }
}
