//! HTTP handlers: thin adapters from query parameters to the places service.
//!
//! Everything interesting happens behind [`PlacesService`]; handlers only
//! validate parameters and shape responses.
//!
//! [`PlacesService`]: crate::places::PlacesService

use crate::places::models::{
    AutocompleteRequest, FieldMask, LocationBias, PhotoRef, PlaceDetails, PlaceSummary,
    SearchRequest, Suggestion,
};
use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::middleware::request_id::propagate_request_id;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn router(state: AppState) -> Router {
    let router = Router::new()
        .route("/api/health", get(health))
        .route("/api/places/search", get(search))
        .route("/api/places/autocomplete", get(autocomplete))
        .route("/api/places/{place_id}", get(details))
        .route("/api/places/{place_id}/photos", get(photos))
        .route("/api/admin/cache/purge", post(purge_cache))
        .with_state(state);

    router.layer((
        // Outermost: the request-ID span wraps everything below it.
        axum::middleware::from_fn(propagate_request_id),
        CorsLayer::permissive(),
        TimeoutLayer::new(REQUEST_TIMEOUT),
    ))
}

/// Build the optional circular bias from loose query parameters.
/// Latitude and longitude must come together; radius defaults to 1km.
fn parse_bias(
    lat: Option<f64>,
    lng: Option<f64>,
    radius: Option<f64>,
) -> Result<Option<LocationBias>, ApiError> {
    match (lat, lng) {
        (Some(latitude), Some(longitude)) => {
            if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                return Err(ApiError::bad_request("lat/lng out of range"));
            }
            Ok(Some(LocationBias {
                latitude,
                longitude,
                radius: radius.unwrap_or(1000.0),
            }))
        }
        (None, None) => Ok(None),
        _ => Err(ApiError::bad_request("lat and lng must be provided together")),
    }
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub fresh: bool,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub places: Vec<PlaceSummary>,
}

/// `GET /api/places/search?q=coffee&lat=..&lng=..&radius=..&limit=..&fresh=true`
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("q must not be empty"));
    }

    let request = SearchRequest {
        query: query.to_owned(),
        location_bias: parse_bias(params.lat, params.lng, params.radius)?,
        max_results: params.limit.map(|l| l.clamp(1, 20)),
    };

    let places = state.places.search(&request, params.fresh).await?;
    Ok(Json(SearchResponse { places }))
}

#[derive(Deserialize)]
pub struct DetailsParams {
    /// Comma-separated field paths; defaults to the standard detail set.
    pub fields: Option<String>,
    #[serde(default)]
    pub fresh: bool,
}

/// `GET /api/places/{place_id}?fields=id,displayName&fresh=true`
async fn details(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
    Query(params): Query<DetailsParams>,
) -> Result<Json<PlaceDetails>, ApiError> {
    let mask = match params.fields.as_deref() {
        Some(raw) => {
            let mask = FieldMask::parse(raw);
            if mask.is_empty() {
                return Err(ApiError::bad_request("fields must name at least one field"));
            }
            mask
        }
        None => FieldMask::default(),
    };

    let details = state.places.get_details(&place_id, &mask, params.fresh).await?;
    Ok(Json(details))
}

fn default_photo_limit() -> u32 {
    10
}

#[derive(Deserialize)]
pub struct PhotosParams {
    #[serde(default = "default_photo_limit")]
    pub limit: u32,
    #[serde(default)]
    pub fresh: bool,
}

#[derive(Serialize)]
pub struct PhotosResponse {
    pub photos: Vec<PhotoRef>,
}

/// `GET /api/places/{place_id}/photos?limit=5`
async fn photos(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
    Query(params): Query<PhotosParams>,
) -> Result<Json<PhotosResponse>, ApiError> {
    let limit = params.limit.clamp(1, 10);
    let photos = state.places.get_photos(&place_id, limit, params.fresh).await?;
    Ok(Json(PhotosResponse { photos }))
}

#[derive(Deserialize)]
pub struct AutocompleteParams {
    pub q: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
    #[serde(default)]
    pub fresh: bool,
}

#[derive(Serialize)]
pub struct AutocompleteResponse {
    pub suggestions: Vec<Suggestion>,
}

/// `GET /api/places/autocomplete?q=blue+bot&lat=..&lng=..`
async fn autocomplete(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> Result<Json<AutocompleteResponse>, ApiError> {
    let input = params.q.trim();
    if input.is_empty() {
        return Err(ApiError::bad_request("q must not be empty"));
    }

    let request = AutocompleteRequest {
        input: input.to_owned(),
        location_bias: parse_bias(params.lat, params.lng, params.radius)?,
    };

    let suggestions = state.places.autocomplete(&request, params.fresh).await?;
    Ok(Json(AutocompleteResponse { suggestions }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache_backend: &'static str,
    pub cache_reachable: bool,
    pub inflight_lookups: usize,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub version: &'static str,
    pub commit: &'static str,
}

/// `GET /api/health`
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache_reachable = state.cache.ping().await.is_ok();
    Json(HealthResponse {
        status: "ok",
        cache_backend: state.cache.backend(),
        cache_reachable,
        inflight_lookups: state.places.inflight_len(),
        started_at: state.started_at,
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_SHORT"),
    })
}

const PURGEABLE_OPERATIONS: &[&str] = &["search", "details", "photos", "autocomplete"];

#[derive(Deserialize)]
pub struct PurgeParams {
    pub op: String,
}

#[derive(Serialize)]
pub struct PurgeResponse {
    pub removed: u64,
}

/// `POST /api/admin/cache/purge?op=search` with `x-admin-token` header.
async fn purge_cache(
    State(state): State<AppState>,
    Query(params): Query<PurgeParams>,
    headers: HeaderMap,
) -> Result<Json<PurgeResponse>, ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(ApiError::Unauthorized);
    };
    let provided = headers
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != expected {
        return Err(ApiError::Unauthorized);
    }

    if !PURGEABLE_OPERATIONS.contains(&params.op.as_str()) {
        return Err(ApiError::bad_request(format!(
            "unknown operation '{}', expected one of: {}",
            params.op,
            PURGEABLE_OPERATIONS.join(", ")
        )));
    }

    let removed = state.cache.purge(&params.op).await;
    tracing::info!(operation = %params.op, removed, "cache purged via admin endpoint");
    Ok(Json(PurgeResponse { removed }))
}
