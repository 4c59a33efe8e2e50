//! Remote lookup client for the Places API (New).
//!
//! Performs the actual upstream HTTP calls given validated parameters and a
//! field mask. Timeouts live in the underlying reqwest client; retries, if
//! any, belong to callers. A single-entity lookup that yields no data is a
//! typed `NotFound`; a search that merely matches nothing is an empty list.

use crate::places::errors::PlacesApiError;
use crate::places::models::{
    AutocompleteRequest, FieldMask, LocationBias, PhotoRef, PlaceDetails, PlaceSummary,
    SearchRequest, Suggestion,
};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum results the upstream accepts for a text search.
const MAX_RESULT_COUNT: u32 = 20;

#[async_trait]
pub trait PlacesClient: Send + Sync {
    async fn search_text(&self, req: &SearchRequest) -> Result<Vec<PlaceSummary>, PlacesApiError>;
    async fn get_details(
        &self,
        place_id: &str,
        fields: &FieldMask,
    ) -> Result<PlaceDetails, PlacesApiError>;
    async fn get_photos(&self, place_id: &str, max_photos: u32)
    -> Result<Vec<PhotoRef>, PlacesApiError>;
    async fn autocomplete(
        &self,
        req: &AutocompleteRequest,
    ) -> Result<Vec<Suggestion>, PlacesApiError>;
}

/// Client for Google's Places API (New) v1.
pub struct GooglePlacesClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl GooglePlacesClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self, PlacesApiError> {
        if api_key.trim().is_empty() {
            return Err(PlacesApiError::MissingApiKey);
        }
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid places base URL: {base_url}"))
            .map_err(PlacesApiError::request)?;
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PlacesApiError::request)?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PlacesApiError> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid endpoint path: {path}"))
            .map_err(PlacesApiError::request)
    }

    /// Send a prepared request and decode the JSON body.
    ///
    /// `not_found_id` marks a single-entity lookup: an upstream 404 becomes
    /// the typed not-found condition instead of a generic failure.
    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
        not_found_id: Option<&str>,
    ) -> Result<T, PlacesApiError> {
        let started = std::time::Instant::now();
        let response = request
            .header("X-Goog-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(PlacesApiError::request)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND
            && let Some(id) = not_found_id
        {
            return Err(PlacesApiError::NotFound(id.to_owned()));
        }

        let body = response.text().await.map_err(PlacesApiError::request)?;
        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(PlacesApiError::request(anyhow!(
                "{url} returned {status}: {snippet}"
            )));
        }

        debug!(
            url = %url,
            status = status.as_u16(),
            elapsed = crate::utils::fmt_duration(started.elapsed()),
            "places request completed"
        );

        decode_json(&body).map_err(|cause| PlacesApiError::ParseFailed {
            status: status.as_u16(),
            url: url.to_string(),
            cause: Arc::new(cause),
        })
    }
}

/// Decode JSON with the serde path included in failures, so a shape change
/// upstream points at the offending field instead of a bare offset.
fn decode_json<T: serde::de::DeserializeOwned>(body: &str) -> anyhow::Result<T> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de)
        .map_err(|err| anyhow!("at path '{}': {}", err.path(), err.inner()))
}

/// Wire shape of the `locationBias` request member.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CircleBias<'a> {
    circle: Circle<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Circle<'a> {
    center: Center<'a>,
    radius: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Center<'a> {
    latitude: &'a f64,
    longitude: &'a f64,
}

impl<'a> From<&'a LocationBias> for CircleBias<'a> {
    fn from(bias: &'a LocationBias) -> Self {
        Self {
            circle: Circle {
                center: Center {
                    latitude: &bias.latitude,
                    longitude: &bias.longitude,
                },
                radius: bias.radius,
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchTextBody<'a> {
    text_query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_bias: Option<CircleBias<'a>>,
    max_result_count: u32,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SearchTextResponse {
    #[serde(default)]
    places: Vec<PlaceSummary>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhotosEnvelope {
    #[serde(default)]
    photos: Vec<PhotoRef>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AutocompleteBody<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_bias: Option<CircleBias<'a>>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AutocompleteResponse {
    #[serde(default)]
    suggestions: Vec<SuggestionEnvelope>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestionEnvelope {
    place_prediction: Option<PlacePrediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacePrediction {
    place_id: String,
    text: PredictionText,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictionText {
    text: String,
}

#[async_trait]
impl PlacesClient for GooglePlacesClient {
    async fn search_text(&self, req: &SearchRequest) -> Result<Vec<PlaceSummary>, PlacesApiError> {
        let url = self.endpoint("/v1/places:searchText")?;
        let body = SearchTextBody {
            text_query: &req.query,
            location_bias: req.location_bias.as_ref().map(CircleBias::from),
            max_result_count: req.max_results.unwrap_or(10).min(MAX_RESULT_COUNT),
        };
        let mask = FieldMask::default().prefixed("places");
        let request = self
            .http
            .post(url.clone())
            .header("X-Goog-FieldMask", mask)
            .json(&body);

        let response: SearchTextResponse = self.execute(request, &url, None).await?;
        Ok(response.places)
    }

    async fn get_details(
        &self,
        place_id: &str,
        fields: &FieldMask,
    ) -> Result<PlaceDetails, PlacesApiError> {
        let url = self.endpoint(&format!("/v1/places/{place_id}"))?;
        let request = self
            .http
            .get(url.clone())
            .header("X-Goog-FieldMask", fields.header_value());
        self.execute(request, &url, Some(place_id)).await
    }

    async fn get_photos(
        &self,
        place_id: &str,
        max_photos: u32,
    ) -> Result<Vec<PhotoRef>, PlacesApiError> {
        // Photo references ride on the details resource under a narrow mask.
        let url = self.endpoint(&format!("/v1/places/{place_id}"))?;
        let request = self
            .http
            .get(url.clone())
            .header("X-Goog-FieldMask", "id,photos");
        let envelope: PhotosEnvelope = self.execute(request, &url, Some(place_id)).await?;
        Ok(envelope
            .photos
            .into_iter()
            .take(max_photos as usize)
            .collect())
    }

    async fn autocomplete(
        &self,
        req: &AutocompleteRequest,
    ) -> Result<Vec<Suggestion>, PlacesApiError> {
        let url = self.endpoint("/v1/places:autocomplete")?;
        let body = AutocompleteBody {
            input: &req.input,
            location_bias: req.location_bias.as_ref().map(CircleBias::from),
        };
        let request = self.http.post(url.clone()).json(&body);

        let response: AutocompleteResponse = self.execute(request, &url, None).await?;
        Ok(response
            .suggestions
            .into_iter()
            .filter_map(|s| s.place_prediction)
            .map(|p| Suggestion {
                place_id: p.place_id,
                description: p.text.text,
            })
            .collect())
    }
}
