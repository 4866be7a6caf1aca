//! Place-provider boundary: wire types for nearby search results and the traits the
//! pipeline and router depend on. `google` holds the HTTP implementation.

pub mod google;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::geo::Coordinates;

pub use google::GoogleMapsClient;

/// Search radius around the query point.
pub const SEARCH_RADIUS_METERS: f64 = 5000.0;
/// Single fixed-size result page.
pub const SEARCH_PAGE_SIZE: u8 = 10;
/// Free-text query sent to the provider.
pub const SEARCH_KEYWORD: &str = "charity";

/// Parameters for one nearby search.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbySearch {
    pub keyword: String,
    pub center: Coordinates,
    pub radius_meters: f64,
    pub max_results: u8,
    pub rank_by_distance: bool,
}

impl NearbySearch {
    pub fn around(center: Coordinates) -> Self {
        Self {
            keyword: SEARCH_KEYWORD.to_string(),
            center,
            radius_meters: SEARCH_RADIUS_METERS,
            max_results: SEARCH_PAGE_SIZE,
            rank_by_distance: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "languageCode", skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPhoto {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_px: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_px: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOpeningHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
    #[serde(default)]
    pub weekday_descriptions: Vec<String>,
}

/// One place as delivered by the provider. Every field is optional on the wire; the
/// normalizer decides which gaps are fatal for a record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlace {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<LocalizedText>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub website_uri: Option<String>,
    #[serde(default)]
    pub google_maps_uri: Option<String>,
    #[serde(default)]
    pub national_phone_number: Option<String>,
    #[serde(default)]
    pub photos: Option<Vec<RawPhoto>>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub regular_opening_hours: Option<RawOpeningHours>,
    #[serde(default)]
    pub current_opening_hours: Option<RawOpeningHours>,
    #[serde(default)]
    pub business_status: Option<String>,
    #[serde(default)]
    pub location: Option<LatLng>,
}

/// Body of a `places:searchText` response; the provider omits `places` when empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearbySearchResponse {
    #[serde(default)]
    pub places: Vec<RawPlace>,
}

#[derive(Debug, thiserror::Error)]
pub enum PlaceSearchError {
    #[error("place provider request failed: {0}")]
    Transport(String),
    #[error("place provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("place provider response could not be decoded: {0}")]
    Decode(String),
    #[error("place provider did not answer within {0:?}")]
    Timeout(std::time::Duration),
    #[error("'{0}' is not a place photo reference")]
    InvalidPhotoName(String),
}

/// Splits a `places/{place}/photos/{photo}` reference into its four segments.
///
/// Returns `None` unless every segment is non-empty and limited to ASCII letters, digits,
/// `-` and `_`, so the reference can only address a photo resource.
pub fn photo_name_segments(name: &str) -> Option<[&str; 4]> {
    let mut parts = name.split('/');
    let segments = [parts.next()?, parts.next()?, parts.next()?, parts.next()?];
    if parts.next().is_some() || segments[0] != "places" || segments[2] != "photos" {
        return None;
    }
    let safe = |segment: &str| {
        !segment.is_empty()
            && segment
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    };
    (safe(segments[1]) && safe(segments[3])).then_some(segments)
}

/// Capability the pipeline needs from the place provider.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn search_nearby(&self, request: &NearbySearch) -> Result<Vec<RawPlace>, PlaceSearchError>;
}

/// Reverse-geocoding payload relayed to the client for its location label.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub formatted_address: String,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// Pass-through lookups backing the photo and postal-code endpoints.
#[async_trait]
pub trait MapsLookup: Send + Sync {
    /// Resolves an opaque photo reference to a URL the client can fetch directly.
    async fn photo_uri(&self, photo_name: &str, max_width_px: u32)
        -> Result<String, PlaceSearchError>;

    async fn reverse_geocode(&self, point: Coordinates)
        -> Result<GeocodeResponse, PlaceSearchError>;
}
