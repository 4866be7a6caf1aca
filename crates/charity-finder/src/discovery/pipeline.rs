use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::domain::{Charity, Enrichment};
use super::enrichment::{CharityEnricher, EnrichmentError};
use super::geo::{CoordinateError, Coordinates};
use super::normalizer::{is_eligible, normalize};
use super::places::{NearbySearch, PlaceSearch, PlaceSearchError};
use super::scoring::rank_by_completeness;

/// Failures that abort a discovery request.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] CoordinateError),
    #[error("charity search is unavailable, try again later")]
    UpstreamUnavailable(#[source] PlaceSearchError),
    #[error("no places found near this location")]
    NoResultsFound,
}

/// Per-call limits for the external collaborators.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryTimeouts {
    pub place_search: Duration,
    pub enrichment: Duration,
}

impl Default for DiscoveryTimeouts {
    fn default() -> Self {
        Self {
            place_search: Duration::from_secs(10),
            enrichment: Duration::from_secs(30),
        }
    }
}

/// Fetches, filters, enriches and ranks charities around a point.
///
/// Holds only shared, immutable collaborators, so one instance serves concurrent requests.
pub struct CharityFinder<P: ?Sized, E: ?Sized> {
    places: Arc<P>,
    enricher: Arc<E>,
    timeouts: DiscoveryTimeouts,
}

impl<P, E> CharityFinder<P, E>
where
    P: PlaceSearch + ?Sized + 'static,
    E: CharityEnricher + ?Sized + 'static,
{
    pub fn new(places: Arc<P>, enricher: Arc<E>) -> Self {
        Self::with_timeouts(places, enricher, DiscoveryTimeouts::default())
    }

    pub fn with_timeouts(places: Arc<P>, enricher: Arc<E>, timeouts: DiscoveryTimeouts) -> Self {
        Self {
            places,
            enricher,
            timeouts,
        }
    }

    /// Ranked charities near `(latitude, longitude)`; an empty list is a valid answer.
    pub async fn find_charities(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<Charity>, DiscoveryError> {
        let query = Coordinates::new(latitude, longitude)?;
        self.find_near(query).await
    }

    pub async fn find_near(&self, query: Coordinates) -> Result<Vec<Charity>, DiscoveryError> {
        let search = NearbySearch::around(query);
        let raw = match tokio::time::timeout(
            self.timeouts.place_search,
            self.places.search_nearby(&search),
        )
        .await
        {
            Ok(Ok(places)) => places,
            Ok(Err(err)) => {
                warn!(error = %err, "place search failed");
                return Err(DiscoveryError::UpstreamUnavailable(err));
            }
            Err(_) => {
                let err = PlaceSearchError::Timeout(self.timeouts.place_search);
                warn!(error = %err, "place search timed out");
                return Err(DiscoveryError::UpstreamUnavailable(err));
            }
        };

        if raw.is_empty() {
            return Err(DiscoveryError::NoResultsFound);
        }
        let raw_count = raw.len();

        let max_distance_km = search.radius_meters / 1000.0;
        let mut seen = HashSet::new();
        let mut charities: Vec<Charity> = raw
            .into_iter()
            .filter_map(|place| match normalize(place, &query) {
                Ok(charity) => Some(charity),
                Err(anomaly) => {
                    warn!(%anomaly, "skipping place record");
                    None
                }
            })
            .filter(is_eligible)
            .filter(|charity| charity.distance_km <= max_distance_km)
            .filter(|charity| seen.insert(charity.id.clone()))
            .collect();

        debug!(raw = raw_count, eligible = charities.len(), "places normalized");

        if !charities.is_empty() {
            let names: Vec<String> = charities.iter().map(|c| c.name.clone()).collect();
            match self.enrich(&names).await {
                Ok(enrichments) => {
                    for (charity, enrichment) in charities.iter_mut().zip(enrichments) {
                        charity.apply_enrichment(enrichment);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "enrichment failed, returning unenriched charities");
                }
            }
        }

        rank_by_completeness(&mut charities);
        info!(
            latitude = query.latitude,
            longitude = query.longitude,
            count = charities.len(),
            "charities ranked"
        );
        Ok(charities)
    }

    async fn enrich(&self, names: &[String]) -> Result<Vec<Enrichment>, EnrichmentError> {
        let enrichments =
            tokio::time::timeout(self.timeouts.enrichment, self.enricher.enrich(names))
                .await
                .map_err(|_| EnrichmentError::Timeout(self.timeouts.enrichment))??;

        if enrichments.len() != names.len() {
            return Err(EnrichmentError::Incomplete {
                expected: names.len(),
                received: enrichments.len(),
            });
        }
        Ok(enrichments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::domain::Category;
    use crate::discovery::places::{LatLng, LocalizedText, RawPlace};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FixedPlaces {
        places: Vec<RawPlace>,
        requests: Mutex<Vec<NearbySearch>>,
    }

    #[async_trait]
    impl PlaceSearch for FixedPlaces {
        async fn search_nearby(
            &self,
            request: &NearbySearch,
        ) -> Result<Vec<RawPlace>, PlaceSearchError> {
            self.requests
                .lock()
                .expect("requests mutex")
                .push(request.clone());
            Ok(self.places.clone())
        }
    }

    struct EchoEnricher;

    #[async_trait]
    impl CharityEnricher for EchoEnricher {
        async fn enrich(&self, names: &[String]) -> Result<Vec<Enrichment>, EnrichmentError> {
            Ok(names
                .iter()
                .map(|name| Enrichment {
                    description: format!("About {name}."),
                    category: Some(Category::Health),
                })
                .collect())
        }
    }

    struct ShortEnricher;

    #[async_trait]
    impl CharityEnricher for ShortEnricher {
        async fn enrich(&self, _names: &[String]) -> Result<Vec<Enrichment>, EnrichmentError> {
            Ok(vec![Enrichment::default()])
        }
    }

    fn place(id: &str) -> RawPlace {
        RawPlace {
            id: Some(id.to_string()),
            display_name: Some(LocalizedText {
                text: format!("Charity {id}"),
                language_code: None,
            }),
            website_uri: Some(format!("https://{id}.example")),
            business_status: Some("OPERATIONAL".to_string()),
            location: Some(LatLng {
                latitude: 40.0,
                longitude: -73.9,
            }),
            ..RawPlace::default()
        }
    }

    #[tokio::test]
    async fn invalid_coordinates_are_rejected_before_searching() {
        let places = Arc::new(FixedPlaces::default());
        let finder = CharityFinder::new(places.clone(), Arc::new(EchoEnricher));

        let result = finder.find_charities(120.0, 0.0).await;
        assert!(matches!(result, Err(DiscoveryError::InvalidRequest(_))));
        assert!(places.requests.lock().expect("requests mutex").is_empty());
    }

    #[tokio::test]
    async fn search_uses_fixed_radius_and_page_size() {
        let places = Arc::new(FixedPlaces {
            places: vec![place("a")],
            ..FixedPlaces::default()
        });
        let finder = CharityFinder::new(places.clone(), Arc::new(EchoEnricher));
        finder.find_charities(40.0, -73.9).await.expect("succeeds");

        let requests = places.requests.lock().expect("requests mutex");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].radius_meters, 5000.0);
        assert_eq!(requests[0].max_results, 10);
    }

    #[tokio::test]
    async fn duplicate_ids_keep_first_occurrence() {
        let mut duplicate = place("a");
        duplicate.display_name = Some(LocalizedText {
            text: "Second copy".to_string(),
            language_code: None,
        });
        let places = Arc::new(FixedPlaces {
            places: vec![place("a"), duplicate, place("b")],
            ..FixedPlaces::default()
        });
        let finder = CharityFinder::new(places, Arc::new(EchoEnricher));

        let charities = finder.find_charities(40.0, -73.9).await.expect("succeeds");
        let names: Vec<_> = charities.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Charity a", "Charity b"]);
        assert_eq!(charities[0].description, "About Charity a.");
    }

    #[tokio::test]
    async fn eligible_copy_survives_an_ineligible_duplicate() {
        let mut closed = place("dup");
        closed.business_status = Some("CLOSED_TEMPORARILY".to_string());
        let places = Arc::new(FixedPlaces {
            places: vec![closed, place("dup")],
            ..FixedPlaces::default()
        });
        let finder = CharityFinder::new(places, Arc::new(EchoEnricher));

        let charities = finder.find_charities(40.0, -73.9).await.expect("succeeds");
        assert_eq!(charities.len(), 1);
        assert_eq!(charities[0].id, "dup");
    }

    #[tokio::test]
    async fn places_beyond_search_radius_are_dropped() {
        let mut far = place("far");
        far.location = Some(LatLng {
            latitude: 40.5,
            longitude: -73.9,
        });
        let places = Arc::new(FixedPlaces {
            places: vec![far, place("near")],
            ..FixedPlaces::default()
        });
        let finder = CharityFinder::new(places, Arc::new(EchoEnricher));

        let charities = finder.find_charities(40.0, -73.9).await.expect("succeeds");
        let ids: Vec<_> = charities.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["near"]);
    }

    #[tokio::test]
    async fn wrong_length_enrichment_is_discarded() {
        let places = Arc::new(FixedPlaces {
            places: vec![place("a"), place("b")],
            ..FixedPlaces::default()
        });
        let finder = CharityFinder::new(places, Arc::new(ShortEnricher));

        let charities = finder.find_charities(40.0, -73.9).await.expect("succeeds");
        assert_eq!(charities.len(), 2);
        assert!(charities.iter().all(|c| c.description.is_empty() && c.category.is_none()));
    }
}
