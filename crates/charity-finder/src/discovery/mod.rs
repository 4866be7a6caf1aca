//! Charity discovery: place search, normalization, enrichment and completeness ranking.

pub mod domain;
pub mod enrichment;
pub mod geo;
pub mod normalizer;
pub mod places;
pub mod pipeline;
pub mod router;
pub mod scoring;

pub use domain::{BusinessStatus, Category, Charity, CharityFlags, Enrichment, PhotoRef};
pub use enrichment::{CharityEnricher, DisabledEnricher, EnrichmentError, OpenAiEnricher};
pub use geo::{distance_km, CoordinateError, Coordinates};
pub use normalizer::{is_eligible, normalize, NormalizationAnomaly};
pub use places::{GoogleMapsClient, MapsLookup, NearbySearch, PlaceSearch, PlaceSearchError};
pub use pipeline::{CharityFinder, DiscoveryError, DiscoveryTimeouts};
pub use router::discovery_router;
pub use scoring::{deficiency_count, rank_by_completeness};
