//! Exercises the reqwest adapters against a local stand-in for the remote APIs.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use charity_finder::config::MergeStrategy;
use charity_finder::discovery::{
    Category, CharityEnricher, Coordinates, EnrichmentError, GoogleMapsClient, MapsLookup,
    NearbySearch, OpenAiEnricher, PlaceSearch, PlaceSearchError,
};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<Value>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
}

impl Recorded {
    fn record(&self, headers: HeaderMap, body: Value) {
        self.headers.lock().expect("headers mutex").push(headers);
        self.bodies.lock().expect("bodies mutex").push(body);
    }
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server runs");
    });
    addr
}

async fn search_text(
    State(recorded): State<Recorded>,
    Path(rest): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if rest.trim_start_matches('/') != "places:searchText" {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": rest })));
    }
    let api_key_ok = headers
        .get("x-goog-api-key")
        .map(|value| value == "maps-key")
        .unwrap_or(false);
    recorded.record(headers, body);
    if !api_key_ok {
        return (StatusCode::FORBIDDEN, Json(json!({ "error": "bad key" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "places": [{
                "id": "p1",
                "displayName": { "text": "Harbor Pantry" },
                "websiteUri": "https://harbor.example",
                "businessStatus": "OPERATIONAL",
                "location": { "latitude": 40.0, "longitude": -73.9 }
            }]
        })),
    )
}

async fn photo_media(
    Path(rest): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let segments: Vec<&str> = rest.trim_start_matches('/').split('/').collect();
    let redirect_skipped = params.get("skipHttpRedirect").map(String::as_str) == Some("true");
    match segments.as_slice() {
        ["places", _, "photos", photo, "media"] if redirect_skipped => {
            let width = params.get("maxWidthPx").cloned().unwrap_or_default();
            (
                StatusCode::OK,
                Json(json!({
                    "name": rest.clone(),
                    "photoUri": format!("https://lh3.example/{photo}?w={width}"),
                })),
            )
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({ "error": rest.clone() }))),
    }
}

async fn geocode(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let latlng = params.get("latlng").cloned().unwrap_or_default();
    if latlng == "0,0" {
        return Json(json!({ "results": [], "status": "REQUEST_DENIED" }));
    }
    Json(json!({
        "results": [{
            "formatted_address": format!("Near {latlng}"),
            "address_components": [
                { "long_name": "10001", "short_name": "10001", "types": ["postal_code"] }
            ]
        }],
        "status": "OK"
    }))
}

fn maps_stub(recorded: Recorded) -> Router {
    Router::new()
        .route("/v1/*rest", post(search_text).get(photo_media))
        .route("/geocode/json", get(geocode))
        .with_state(recorded)
}

async fn maps_client(key: &str) -> (GoogleMapsClient, Recorded) {
    let recorded = Recorded::default();
    let addr = serve(maps_stub(recorded.clone())).await;
    let client = GoogleMapsClient::new(
        key,
        format!("http://{addr}/v1/"),
        format!("http://{addr}/geocode"),
        Duration::from_secs(5),
    )
    .expect("client builds");
    (client, recorded)
}

#[tokio::test]
async fn google_search_sends_distance_ranked_bounded_query() {
    let (client, recorded) = maps_client("maps-key").await;
    let center = Coordinates::new(40.0, -73.9).expect("valid");

    let places = client
        .search_nearby(&NearbySearch::around(center))
        .await
        .expect("search succeeds");
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].id.as_deref(), Some("p1"));

    let body = recorded.bodies.lock().expect("bodies mutex")[0].clone();
    assert_eq!(body["textQuery"], "charity");
    assert_eq!(body["pageSize"], 10);
    assert_eq!(body["rankPreference"], "DISTANCE");
    assert_eq!(body["locationBias"]["circle"]["radius"], 5000.0);
    assert_eq!(body["locationBias"]["circle"]["center"]["latitude"], 40.0);

    let headers = recorded.headers.lock().expect("headers mutex")[0].clone();
    let mask = headers
        .get("x-goog-fieldmask")
        .and_then(|value| value.to_str().ok())
        .expect("field mask header");
    assert!(mask.contains("places.businessStatus"));
}

#[tokio::test]
async fn google_search_maps_error_status() {
    let (client, _) = maps_client("wrong-key").await;
    let center = Coordinates::new(40.0, -73.9).expect("valid");

    match client.search_nearby(&NearbySearch::around(center)).await {
        Err(PlaceSearchError::Status { status: 403, .. }) => {}
        other => panic!("expected 403 status error, got {other:?}"),
    }
}

#[tokio::test]
async fn google_photo_and_geocode_lookups() {
    let (client, _) = maps_client("maps-key").await;

    let uri = client
        .photo_uri("places/p1/photos/abc", 640)
        .await
        .expect("photo resolves");
    assert_eq!(uri, "https://lh3.example/abc?w=640");

    assert!(matches!(
        client.photo_uri("../admin/secret?leak=1#", 800).await,
        Err(PlaceSearchError::InvalidPhotoName(_))
    ));

    let point = Coordinates::new(40.75, -73.99).expect("valid");
    let geocode = client.reverse_geocode(point).await.expect("geocode");
    assert_eq!(geocode.results[0].formatted_address, "Near 40.75,-73.99");
    assert_eq!(geocode.results[0].address_components[0].long_name, "10001");

    let denied = Coordinates::new(0.0, 0.0).expect("valid");
    assert!(matches!(
        client.reverse_geocode(denied).await,
        Err(PlaceSearchError::Status { .. })
    ));
}

async fn chat_completions(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let user_prompt = body["messages"][1]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    recorded.record(headers, body);

    let content = if user_prompt.contains("Broken Org") {
        "not json at all".to_string()
    } else {
        json!({
            "charities": [
                { "description": "Serves meals.", "name": "Soup Kitchen", "category": "Food" },
                { "description": "Teaches kids.", "name": "Reading Buddies", "category": "education" }
            ]
        })
        .to_string()
    };

    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

async fn enricher(merge: MergeStrategy) -> (OpenAiEnricher, Recorded) {
    let recorded = Recorded::default();
    let router = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(recorded.clone());
    let addr = serve(router).await;
    let enricher = OpenAiEnricher::new(
        "sk-test",
        format!("http://{addr}/v1"),
        "gpt-test",
        merge,
        Duration::from_secs(5),
    )
    .expect("client builds");
    (enricher, recorded)
}

#[tokio::test]
async fn openai_enricher_parses_json_mode_completion() {
    let (enricher, recorded) = enricher(MergeStrategy::Positional).await;
    let names = vec!["Soup Kitchen".to_string(), "Reading Buddies".to_string()];

    let enrichments = enricher.enrich(&names).await.expect("enrichment succeeds");
    assert_eq!(enrichments.len(), 2);
    assert_eq!(enrichments[0].category, Some(Category::Food));
    assert_eq!(enrichments[0].description, "Serves meals.");
    assert_eq!(enrichments[1].category, Some(Category::Education));

    let headers = recorded.headers.lock().expect("headers mutex")[0].clone();
    assert_eq!(
        headers.get("authorization").expect("auth header"),
        "Bearer sk-test"
    );
    let body = recorded.bodies.lock().expect("bodies mutex")[0].clone();
    assert_eq!(body["response_format"]["type"], "json_object");
}

#[tokio::test]
async fn openai_enricher_can_match_by_name() {
    let (enricher, _) = enricher(MergeStrategy::ByName).await;
    let names = vec!["Reading Buddies".to_string(), "Soup Kitchen".to_string()];

    let enrichments = enricher.enrich(&names).await.expect("enrichment succeeds");
    assert_eq!(enrichments[0].category, Some(Category::Education));
    assert_eq!(enrichments[1].category, Some(Category::Food));
}

#[tokio::test]
async fn openai_enricher_reports_malformed_content() {
    let (enricher, _) = enricher(MergeStrategy::Positional).await;
    let names = vec!["Broken Org".to_string()];

    assert!(matches!(
        enricher.enrich(&names).await,
        Err(EnrichmentError::Malformed(_))
    ));
}
