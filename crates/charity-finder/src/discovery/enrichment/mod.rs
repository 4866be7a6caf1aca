//! Descriptions and category labels for charities, produced by a text-generation service.

pub mod openai;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{Category, Enrichment};
use crate::config::MergeStrategy;

pub use openai::OpenAiEnricher;

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("enrichment is not configured")]
    Disabled,
    #[error("enrichment request failed: {0}")]
    Transport(String),
    #[error("enrichment service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("enrichment response is not valid JSON: {0}")]
    Malformed(String),
    #[error("enrichment response is missing the charities array")]
    MissingCharities,
    #[error("enrichment returned {received} entries for {expected} charities")]
    Incomplete { expected: usize, received: usize },
    #[error("enrichment response matched none of the requested charities")]
    Unmatched,
    #[error("enrichment did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

/// Capability the pipeline needs from the enrichment service.
///
/// Implementations return exactly one [`Enrichment`] per input name, in input order.
#[async_trait]
pub trait CharityEnricher: Send + Sync {
    async fn enrich(&self, names: &[String]) -> Result<Vec<Enrichment>, EnrichmentError>;
}

/// Stand-in used when no text-generation credentials are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledEnricher;

#[async_trait]
impl CharityEnricher for DisabledEnricher {
    async fn enrich(&self, _names: &[String]) -> Result<Vec<Enrichment>, EnrichmentError> {
        Err(EnrichmentError::Disabled)
    }
}

/// Shape the service is instructed to produce.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentPayload {
    pub charities: Vec<EnrichedEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichedEntry {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl EnrichedEntry {
    fn into_enrichment(self) -> Enrichment {
        Enrichment {
            description: self.description.unwrap_or_default().trim().to_string(),
            category: Some(Category::from_label(
                self.category.as_deref().unwrap_or_default(),
            )),
        }
    }
}

/// Parses the raw model output and lines it up with the names that were sent.
pub fn parse_enrichment(
    raw: &str,
    names: &[String],
    strategy: MergeStrategy,
) -> Result<Vec<Enrichment>, EnrichmentError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|err| EnrichmentError::Malformed(err.to_string()))?;
    let charities = value
        .get("charities")
        .filter(|charities| charities.is_array())
        .cloned()
        .ok_or(EnrichmentError::MissingCharities)?;
    let entries: Vec<EnrichedEntry> = serde_json::from_value(charities)
        .map_err(|err| EnrichmentError::Malformed(err.to_string()))?;

    match strategy {
        MergeStrategy::Positional => align_by_position(entries, names.len()),
        MergeStrategy::ByName => align_by_name(entries, names),
    }
}

fn align_by_position(
    entries: Vec<EnrichedEntry>,
    expected: usize,
) -> Result<Vec<Enrichment>, EnrichmentError> {
    if entries.len() < expected {
        return Err(EnrichmentError::Incomplete {
            expected,
            received: entries.len(),
        });
    }
    Ok(entries
        .into_iter()
        .take(expected)
        .map(EnrichedEntry::into_enrichment)
        .collect())
}

fn name_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Names the service did not echo back stay unenriched.
fn align_by_name(
    entries: Vec<EnrichedEntry>,
    names: &[String],
) -> Result<Vec<Enrichment>, EnrichmentError> {
    let mut by_name: HashMap<String, EnrichedEntry> = HashMap::new();
    for entry in entries {
        by_name
            .entry(name_key(entry.name.as_deref().unwrap_or_default()))
            .or_insert(entry);
    }

    let mut matched = 0usize;
    let aligned: Vec<Enrichment> = names
        .iter()
        .map(|name| match by_name.get(&name_key(name)) {
            Some(entry) => {
                matched += 1;
                entry.clone().into_enrichment()
            }
            None => Enrichment::default(),
        })
        .collect();

    if matched == 0 && !names.is_empty() {
        return Err(EnrichmentError::Unmatched);
    }
    Ok(aligned)
}
