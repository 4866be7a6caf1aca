use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of labels the enrichment service may assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Health,
    Education,
    Other,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Health => "health",
            Category::Education => "education",
            Category::Other => "other",
        }
    }

    /// Lenient mapping for model output: anything unrecognised is `Other`.
    pub fn from_label(value: &str) -> Self {
        value.parse().unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}' (expected food, health, education or other)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "food" => Ok(Category::Food),
            "health" => Ok(Category::Health),
            "education" => Ok(Category::Education),
            "other" => Ok(Category::Other),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// Operating state reported by the place provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BusinessStatus {
    Operational,
    ClosedTemporarily,
    ClosedPermanently,
    #[default]
    Unspecified,
}

impl BusinessStatus {
    pub fn from_provider(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("OPERATIONAL") => Self::Operational,
            Some("CLOSED_TEMPORARILY") => Self::ClosedTemporarily,
            Some("CLOSED_PERMANENTLY") => Self::ClosedPermanently,
            _ => Self::Unspecified,
        }
    }
}

/// Opaque photo reference; the client resolves it through the photo endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_px: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_px: Option<u32>,
}

/// Data-quality gaps detected from the raw provider record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharityFlags {
    pub no_website: bool,
    pub no_photos: bool,
    pub no_phone_number: bool,
    pub no_opening_hours: bool,
    pub no_rating: bool,
}

impl CharityFlags {
    pub(crate) fn as_array(&self) -> [bool; 5] {
        [
            self.no_website,
            self.no_photos,
            self.no_phone_number,
            self.no_opening_hours,
            self.no_rating,
        ]
    }
}

/// Description and label produced by the enrichment service for one charity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Enrichment {
    pub description: String,
    pub category: Option<Category>,
}

/// A nearby organization as returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Charity {
    pub id: String,
    pub name: String,
    pub address: String,
    pub link: Option<String>,
    pub maps_link: Option<String>,
    pub phone_number: Option<String>,
    pub photos: Vec<PhotoRef>,
    pub rating: Option<f64>,
    pub open_now: Option<bool>,
    pub opening_hours: Option<Vec<String>>,
    pub distance_km: f64,
    pub description: String,
    pub category: Option<Category>,
    pub flags: CharityFlags,
    #[serde(skip)]
    pub business_status: BusinessStatus,
}

impl Charity {
    pub fn apply_enrichment(&mut self, enrichment: Enrichment) {
        self.description = enrichment.description;
        self.category = enrichment.category;
    }
}
