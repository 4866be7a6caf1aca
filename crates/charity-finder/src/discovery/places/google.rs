use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::{
    photo_name_segments, GeocodeResponse, MapsLookup, NearbySearch, NearbySearchResponse,
    PlaceSearch, PlaceSearchError, RawPlace,
};
use crate::config::{ConfigError, PlacesConfig};
use crate::discovery::geo::Coordinates;

/// Fields requested from the provider; anything else is billed but unused.
const FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,\
places.websiteUri,places.googleMapsUri,places.nationalPhoneNumber,places.photos,\
places.rating,places.regularOpeningHours,places.currentOpeningHours,\
places.businessStatus,places.location";

/// Google Maps platform adapter covering text search, photo media and geocoding.
#[derive(Clone)]
pub struct GoogleMapsClient {
    http: Client,
    api_key: String,
    base_url: String,
    geocoding_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for GoogleMapsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleMapsClient")
            .field("base_url", &self.base_url)
            .field("geocoding_url", &self.geocoding_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextSearchRequest<'a> {
    text_query: &'a str,
    page_size: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    rank_preference: Option<&'static str>,
    location_bias: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhotoMediaResponse {
    photo_uri: String,
}

impl GoogleMapsClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        geocoding_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PlaceSearchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PlaceSearchError::Transport(err.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: trim_slash(base_url.into()),
            geocoding_url: trim_slash(geocoding_url.into()),
            timeout,
        })
    }

    pub fn from_config(config: &PlacesConfig) -> Result<Self, ConfigOrClientError> {
        let api_key = config.require_api_key()?;
        Ok(Self::new(
            api_key,
            config.base_url.clone(),
            config.geocoding_url.clone(),
            config.timeout,
        )?)
    }

    fn map_send_error(&self, err: reqwest::Error) -> PlaceSearchError {
        if err.is_timeout() {
            PlaceSearchError::Timeout(self.timeout)
        } else {
            PlaceSearchError::Transport(err.to_string())
        }
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, PlaceSearchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, "place provider returned an error status");
        Err(PlaceSearchError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Either the configuration was incomplete or the HTTP client could not be built.
#[derive(Debug, thiserror::Error)]
pub enum ConfigOrClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Client(#[from] PlaceSearchError),
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[async_trait]
impl PlaceSearch for GoogleMapsClient {
    async fn search_nearby(
        &self,
        request: &NearbySearch,
    ) -> Result<Vec<RawPlace>, PlaceSearchError> {
        let body = TextSearchRequest {
            text_query: &request.keyword,
            page_size: request.max_results,
            rank_preference: request.rank_by_distance.then_some("DISTANCE"),
            location_bias: json!({
                "circle": {
                    "center": {
                        "latitude": request.center.latitude,
                        "longitude": request.center.longitude,
                    },
                    "radius": request.radius_meters,
                }
            }),
        };

        let response = self
            .http
            .post(format!("{}/places:searchText", self.base_url))
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&body)
            .send()
            .await
            .map_err(|err| self.map_send_error(err))?;

        let response = Self::ensure_success(response).await?;
        let payload: NearbySearchResponse = response
            .json()
            .await
            .map_err(|err| PlaceSearchError::Decode(err.to_string()))?;

        debug!(count = payload.places.len(), "place search returned");
        Ok(payload.places)
    }
}

#[async_trait]
impl MapsLookup for GoogleMapsClient {
    async fn photo_uri(
        &self,
        photo_name: &str,
        max_width_px: u32,
    ) -> Result<String, PlaceSearchError> {
        let segments = photo_name_segments(photo_name)
            .ok_or_else(|| PlaceSearchError::InvalidPhotoName(photo_name.to_string()))?;
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| PlaceSearchError::Transport(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| {
                PlaceSearchError::Transport(format!("{} cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments)
            .push("media");

        let response = self
            .http
            .get(url)
            .header("X-Goog-Api-Key", &self.api_key)
            .query(&[
                ("maxWidthPx", max_width_px.to_string()),
                ("skipHttpRedirect", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|err| self.map_send_error(err))?;

        let response = Self::ensure_success(response).await?;
        let media: PhotoMediaResponse = response
            .json()
            .await
            .map_err(|err| PlaceSearchError::Decode(err.to_string()))?;
        Ok(media.photo_uri)
    }

    async fn reverse_geocode(
        &self,
        point: Coordinates,
    ) -> Result<GeocodeResponse, PlaceSearchError> {
        let response = self
            .http
            .get(format!("{}/json", self.geocoding_url))
            .query(&[
                (
                    "latlng",
                    format!("{},{}", point.latitude, point.longitude),
                ),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|err| self.map_send_error(err))?;

        let response = Self::ensure_success(response).await?;
        let payload: GeocodeResponse = response
            .json()
            .await
            .map_err(|err| PlaceSearchError::Decode(err.to_string()))?;

        match payload.status.as_deref() {
            None | Some("OK") | Some("ZERO_RESULTS") => Ok(payload),
            Some(other) => Err(PlaceSearchError::Status {
                status: 200,
                body: format!("geocoding status {other}"),
            }),
        }
    }
}
