pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod geo;
pub mod geocode;
pub mod gpx_export;
pub mod graph;
pub mod models;
pub mod oracle;
pub mod scoring;
pub mod search;
pub mod summary;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::Deserialize;
use shared::{ApiError, SearchRequest, SearchResponse, SearchStatus};
use tower_http::cors::CorsLayer;

use crate::geocode::{GeocodeCache, GeocodeError};
use crate::gpx_export::encode_candidate_as_gpx;
use crate::models::{GeocodeResult, RouteType, SearchParameters};
use crate::oracle::RouteOracle;
use crate::search::{AdaptiveSearch, SearchFailure, SearchOutcome};
use crate::summary::summarize;

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<AdaptiveSearch<Arc<dyn RouteOracle>>>,
    pub geocoder: Arc<GeocodeCache>,
    /// Upper bound on one search, pacing included.
    pub search_timeout: Duration,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", post(search_handler))
        .route("/api/geocode", get(geocode_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

async fn search_handler(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<SearchResponse> {
    let Json(req) = payload.map_err(|rejection| {
        api_error(StatusCode::BAD_REQUEST, &rejection.body_text(), false)
    })?;

    // Reject bad input before the geocoder or the oracle is contacted.
    let target_km = req
        .target_km
        .ok_or_else(|| {
            SearchFailure::InvalidParameters("target distance is required".to_string())
        })
        .and_then(|target_km| state.search.validate_target(target_km))
        .map_err(search_error)?;

    let (origin, resolved) = match (req.origin, req.location.as_deref()) {
        (Some(origin), _) => (origin, None),
        (None, Some(location)) => {
            let place = state
                .geocoder
                .resolve(location)
                .await
                .map_err(geocode_error)?;
            (place.coordinate(), Some(place))
        }
        (None, None) => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "either origin or location is required",
                false,
            ))
        }
    };

    let params = SearchParameters {
        origin,
        target_km,
        profile: req.profile,
        route_type: req.route_type,
    };
    let mut rng = match req.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let outcome = tokio::time::timeout(
        state.search_timeout,
        state.search.search(&params, &mut rng),
    )
    .await
    .map_err(|_| {
        tracing::warn!("search exceeded {:?}", state.search_timeout);
        api_error(
            StatusCode::GATEWAY_TIMEOUT,
            "route search took too long",
            true,
        )
    })?;

    let (status, candidate) = match outcome {
        SearchOutcome::Accepted(candidate) => (SearchStatus::Accepted, candidate),
        SearchOutcome::FallbackAccepted(candidate) => (SearchStatus::FallbackAccepted, candidate),
        SearchOutcome::Failed(failure) => return Err(search_error(failure)),
    };

    let track_name = match params.route_type {
        RouteType::Loop => "routeflow loop",
        RouteType::PointToPoint => "routeflow route",
    };
    let gpx_base64 = encode_candidate_as_gpx(&candidate, track_name).map_err(|err| {
        api_error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string(), false)
    })?;

    Ok(Json(SearchResponse {
        status,
        target_km: params.target_km,
        route: summarize(origin, &candidate),
        gpx_base64,
        resolved,
    }))
}

#[derive(Debug, Deserialize)]
struct GeocodeQuery {
    q: String,
}

async fn geocode_handler(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> ApiResult<GeocodeResult> {
    state
        .geocoder
        .resolve(&query.q)
        .await
        .map(Json)
        .map_err(geocode_error)
}

fn api_error(status: StatusCode, message: &str, retry_later: bool) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            message: message.to_string(),
            retry_later,
        }),
    )
}

fn search_error(failure: SearchFailure) -> (StatusCode, Json<ApiError>) {
    let status = match failure {
        SearchFailure::InvalidParameters(_) => StatusCode::BAD_REQUEST,
        SearchFailure::OracleRateLimited => StatusCode::TOO_MANY_REQUESTS,
        SearchFailure::NoAcceptableRoute => StatusCode::UNPROCESSABLE_ENTITY,
    };
    api_error(status, &failure.to_string(), failure.retry_later())
}

fn geocode_error(err: GeocodeError) -> (StatusCode, Json<ApiError>) {
    let (status, retry_later) = match err {
        GeocodeError::EmptyQuery => (StatusCode::BAD_REQUEST, false),
        GeocodeError::NotFound(_) => (StatusCode::NOT_FOUND, false),
        GeocodeError::Service(_) => (StatusCode::BAD_GATEWAY, true),
    };
    api_error(status, &err.to_string(), retry_later)
}
