use charity_finder::config::AppConfig;
use charity_finder::discovery::{
    CharityEnricher, CharityFinder, DisabledEnricher, DiscoveryTimeouts, GoogleMapsClient,
    OpenAiEnricher,
};
use charity_finder::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Finder = CharityFinder<GoogleMapsClient, dyn CharityEnricher>;

/// Collaborators built once per process from configuration.
pub(crate) struct Discovery {
    pub(crate) finder: Arc<Finder>,
    pub(crate) maps: Arc<GoogleMapsClient>,
}

pub(crate) fn build_discovery(config: &AppConfig) -> Result<Discovery, AppError> {
    let maps = Arc::new(GoogleMapsClient::from_config(&config.places)?);

    let enricher: Arc<dyn CharityEnricher> = match OpenAiEnricher::from_config(&config.enrichment)?
    {
        Some(enricher) => Arc::new(enricher),
        None => {
            warn!("OPENAI_API_KEY not set; charities will be returned without descriptions");
            Arc::new(DisabledEnricher)
        }
    };

    let timeouts = DiscoveryTimeouts {
        place_search: config.places.timeout,
        enrichment: config.enrichment.timeout,
    };
    let finder = Arc::new(CharityFinder::with_timeouts(
        maps.clone(),
        enricher,
        timeouts,
    ));

    Ok(Discovery { finder, maps })
}
