use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// How enrichment results are attached to the charities that were sent out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Entry `i` of the response belongs to name `i` of the request.
    #[default]
    Positional,
    /// Entries are matched by the name the service echoes back.
    ByName,
}

impl MergeStrategy {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positional" | "position" => Ok(Self::Positional),
            "name" | "by_name" | "by-name" => Ok(Self::ByName),
            other => Err(ConfigError::InvalidMergeStrategy(other.to_string())),
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub places: PlacesConfig,
    pub enrichment: EnrichmentConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let places = PlacesConfig {
            api_key: optional_var("GOOGLE_MAPS_API_KEY"),
            base_url: env::var("PLACES_BASE_URL")
                .unwrap_or_else(|_| "https://places.googleapis.com/v1".to_string()),
            geocoding_url: env::var("GEOCODING_BASE_URL")
                .unwrap_or_else(|_| "https://maps.googleapis.com/maps/api/geocode".to_string()),
            timeout: seconds_var("PLACES_TIMEOUT_SECS", 10)?,
        };

        let merge = match optional_var("ENRICHMENT_MERGE") {
            Some(value) => MergeStrategy::parse(&value)?,
            None => MergeStrategy::default(),
        };

        let enrichment = EnrichmentConfig {
            api_key: optional_var("OPENAI_API_KEY"),
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo-1106".to_string()),
            timeout: seconds_var("ENRICHMENT_TIMEOUT_SECS", 30)?,
            merge,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            places,
            enrichment,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn seconds_var(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match optional_var(name) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or(ConfigError::InvalidTimeout { name }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Google Maps platform access: nearby search, photo media and reverse geocoding.
#[derive(Clone)]
pub struct PlacesConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub geocoding_url: String,
    pub timeout: Duration,
}

impl PlacesConfig {
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingVar("GOOGLE_MAPS_API_KEY"))
    }
}

impl fmt::Debug for PlacesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacesConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("geocoding_url", &self.geocoding_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Text-generation service used to describe and categorize charities.
#[derive(Clone)]
pub struct EnrichmentConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub merge: MergeStrategy,
}

impl fmt::Debug for EnrichmentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrichmentConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("merge", &self.merge)
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout { name: &'static str },
    InvalidMergeStrategy(String),
    MissingVar(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout { name } => {
                write!(f, "{name} must be a positive number of seconds")
            }
            ConfigError::InvalidMergeStrategy(value) => write!(
                f,
                "ENRICHMENT_MERGE must be 'positional' or 'name' (got '{value}')"
            ),
            ConfigError::MissingVar(name) => write!(f, "{name} must be set"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout { .. }
            | ConfigError::InvalidMergeStrategy(_)
            | ConfigError::MissingVar(_) => None,
        }
    }
}
