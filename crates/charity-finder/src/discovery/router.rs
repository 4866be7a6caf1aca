use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::domain::{Category, Charity};
use super::enrichment::CharityEnricher;
use super::geo::Coordinates;
use super::pipeline::{CharityFinder, DiscoveryError};
use super::places::{photo_name_segments, MapsLookup, PlaceSearch, PlaceSearchError};

/// Default width requested for photo redirects.
pub const DEFAULT_PHOTO_WIDTH_PX: u32 = 800;
const MAX_PHOTO_WIDTH_PX: u32 = 4800;

pub struct DiscoveryState<P: ?Sized, E: ?Sized, L: ?Sized> {
    pub finder: Arc<CharityFinder<P, E>>,
    pub lookup: Arc<L>,
}

impl<P: ?Sized, E: ?Sized, L: ?Sized> Clone for DiscoveryState<P, E, L> {
    fn clone(&self) -> Self {
        Self {
            finder: self.finder.clone(),
            lookup: self.lookup.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CharityQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CharityListResponse {
    pub charities: Vec<Charity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoQuery {
    pub path: Option<String>,
    pub max_width_px: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PointQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

/// Router builder exposing the discovery endpoints consumed by the mobile client.
pub fn discovery_router<P, E, L>(finder: Arc<CharityFinder<P, E>>, lookup: Arc<L>) -> Router
where
    P: PlaceSearch + ?Sized + 'static,
    E: CharityEnricher + ?Sized + 'static,
    L: MapsLookup + ?Sized + 'static,
{
    Router::new()
        .route("/charities", get(charities_handler::<P, E, L>))
        .route("/photo", get(photo_handler::<P, E, L>))
        .route("/postal-code", get(postal_code_handler::<P, E, L>))
        .with_state(DiscoveryState { finder, lookup })
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, Json(payload)).into_response()
}

impl IntoResponse for DiscoveryError {
    fn into_response(self) -> Response {
        let status = match self {
            DiscoveryError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DiscoveryError::NoResultsFound => StatusCode::NOT_FOUND,
            DiscoveryError::UpstreamUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_body(status, self.to_string())
    }
}

pub(crate) async fn charities_handler<P, E, L>(
    State(state): State<DiscoveryState<P, E, L>>,
    Query(query): Query<CharityQuery>,
) -> Response
where
    P: PlaceSearch + ?Sized + 'static,
    E: CharityEnricher + ?Sized + 'static,
    L: MapsLookup + ?Sized + 'static,
{
    let category = match query.category.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => match raw.parse::<Category>() {
            Ok(category) => Some(category),
            Err(err) => return error_body(StatusCode::BAD_REQUEST, err.to_string()),
        },
    };

    let point = match Coordinates::parse(query.lat.as_deref(), query.lon.as_deref()) {
        Ok(point) => point,
        Err(err) => return DiscoveryError::InvalidRequest(err).into_response(),
    };

    match state.finder.find_near(point).await {
        Ok(mut charities) => {
            if let Some(category) = category {
                charities.retain(|charity| charity.category == Some(category));
            }
            (StatusCode::OK, Json(CharityListResponse { charities })).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn photo_handler<P, E, L>(
    State(state): State<DiscoveryState<P, E, L>>,
    Query(query): Query<PhotoQuery>,
) -> Response
where
    P: PlaceSearch + ?Sized + 'static,
    E: CharityEnricher + ?Sized + 'static,
    L: MapsLookup + ?Sized + 'static,
{
    let Some(path) = query
        .path
        .as_deref()
        .map(str::trim)
        .filter(|path| !path.is_empty())
    else {
        return error_body(StatusCode::BAD_REQUEST, "missing photo path");
    };
    if photo_name_segments(path).is_none() {
        return error_body(
            StatusCode::BAD_REQUEST,
            PlaceSearchError::InvalidPhotoName(path.to_string()).to_string(),
        );
    }
    let width = query
        .max_width_px
        .unwrap_or(DEFAULT_PHOTO_WIDTH_PX)
        .clamp(1, MAX_PHOTO_WIDTH_PX);

    match state.lookup.photo_uri(path, width).await {
        Ok(uri) => Redirect::temporary(&uri).into_response(),
        Err(err) => {
            warn!(error = %err, "photo lookup failed");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "photo is unavailable, try again later",
            )
        }
    }
}

pub(crate) async fn postal_code_handler<P, E, L>(
    State(state): State<DiscoveryState<P, E, L>>,
    Query(query): Query<PointQuery>,
) -> Response
where
    P: PlaceSearch + ?Sized + 'static,
    E: CharityEnricher + ?Sized + 'static,
    L: MapsLookup + ?Sized + 'static,
{
    let point = match Coordinates::parse(query.lat.as_deref(), query.lon.as_deref()) {
        Ok(point) => point,
        Err(err) => return DiscoveryError::InvalidRequest(err).into_response(),
    };

    match state.lookup.reverse_geocode(point).await {
        Ok(geocode) if geocode.results.is_empty() => {
            error_body(StatusCode::NOT_FOUND, "no address found for this location")
        }
        Ok(geocode) => (StatusCode::OK, Json(geocode)).into_response(),
        Err(err) => {
            warn!(error = %err, "reverse geocoding failed");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "address lookup is unavailable, try again later",
            )
        }
    }
}
