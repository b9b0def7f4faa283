use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::{AppState, Lang};
use crate::WeatherView;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/weather", get(handler))
}

/// Query parameters for `GET /weather`
#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    city: Option<String>,
}

#[derive(Serialize)]
struct Success<'a> {
    status: &'static str,
    data: &'a WeatherView,
}

#[derive(Serialize)]
struct Failure {
    status: &'static str,
    message: &'static str,
}

async fn handler(
    Query(params): Query<WeatherQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    // ---
    let lang = Lang::from_headers(&headers);

    let Some(city) = params
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_lowercase)
    else {
        return failure(StatusCode::BAD_REQUEST, lang);
    };

    if let Some(view) = state.cache.get(&city).await {
        debug!("GET /weather - cache hit for '{}'", city);
        return success(&view);
    }

    match state.store.latest_for_city(&city).await {
        Ok(Some(reading)) => {
            let view = WeatherView::from(reading);
            state.cache.insert(city, view.clone()).await;
            success(&view)
        }
        Ok(None) => {
            warn!("GET /weather - no reading for '{}'", city);
            failure(StatusCode::NOT_FOUND, lang)
        }
        Err(e) => {
            error!("GET /weather - store lookup for '{}' failed: {:#}", city, e);
            failure(StatusCode::SERVICE_UNAVAILABLE, lang)
        }
    }
}

fn success(view: &WeatherView) -> Response {
    // ---
    let body = Success {
        status: "success",
        data: view,
    };
    (StatusCode::OK, Json(body)).into_response()
}

fn failure(status: StatusCode, lang: Lang) -> Response {
    // ---
    let body = Failure {
        status: "error",
        message: lang.message(status),
    };
    (status, Json(body)).into_response()
}
