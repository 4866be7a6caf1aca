use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    parse_enrichment, CharityEnricher, EnrichedEntry, EnrichmentError, EnrichmentPayload,
};
use crate::config::{EnrichmentConfig, MergeStrategy};
use crate::discovery::domain::Enrichment;

/// Chat-completions adapter running in JSON mode.
#[derive(Clone)]
pub struct OpenAiEnricher {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    merge: MergeStrategy,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEnricher")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("merge", &self.merge)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiEnricher {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        merge: MergeStrategy,
        timeout: Duration,
    ) -> Result<Self, EnrichmentError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EnrichmentError::Transport(err.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            merge,
            timeout,
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &EnrichmentConfig) -> Result<Option<Self>, EnrichmentError> {
        let Some(api_key) = config.api_key.as_deref() else {
            return Ok(None);
        };
        Self::new(
            api_key,
            config.base_url.clone(),
            config.model.clone(),
            config.merge,
            config.timeout,
        )
        .map(Some)
    }

    fn request_body(&self, names: &[String]) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(names),
                },
            ],
        }
    }
}

pub(crate) fn system_prompt() -> String {
    let example = EnrichmentPayload {
        charities: vec![EnrichedEntry {
            description: Some(String::new()),
            name: Some(String::new()),
            category: Some(String::new()),
        }],
    };
    let example = serde_json::to_string_pretty(&example).unwrap_or_default();
    format!(
        "Provide output in valid JSON which looks like this: {example}. \
You get descriptions of charities and categorize them into food, health, education or other. \
Return one entry per charity, in the order given, and repeat each charity's name exactly."
    )
}

pub(crate) fn user_prompt(names: &[String]) -> String {
    format!(
        "Provide output in valid JSON, generate a small two sentence description of these \
charities: {}. And separately categorize them into food, health, education or other.",
        names.join(", ")
    )
}

#[async_trait]
impl CharityEnricher for OpenAiEnricher {
    async fn enrich(&self, names: &[String]) -> Result<Vec<Enrichment>, EnrichmentError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let start = std::time::Instant::now();
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(names))
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    EnrichmentError::Timeout(self.timeout)
                } else {
                    warn!(error = %err, "enrichment request failed");
                    EnrichmentError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|err| EnrichmentError::Malformed(err.to_string()))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| EnrichmentError::Malformed("no completion content".to_string()))?;

        debug!(
            model = %self.model,
            charities = names.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "enrichment completion received"
        );

        parse_enrichment(&content, names, self.merge)
    }
}
