//! Sentiment analysis for spoken behavioral answers

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{Error, Result};

const SENTIMENT_PATH: &str = "/text/analytics/v3.1/sentiment";

/// Overall document sentiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
    Mixed,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
            Self::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub confidence: ConfidenceScores,
}

/// Trait for sentiment analysis providers
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Classify the sentiment of `text`
    async fn analyze(&self, text: &str) -> Result<SentimentResult>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}

/// Azure AI Language (Text Analytics v3.1) sentiment provider
pub struct AzureSentimentProvider {
    client: Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl AzureSentimentProvider {
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint
                .map(|e| e.trim_end_matches('/').to_string())
                .filter(|e| !e.is_empty()),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.endpoint.as_deref(), self.api_key.as_deref()) {
            (Some(endpoint), Some(key)) => Ok((endpoint, key)),
            _ => Err(Error::ProviderNotConfigured(
                "Azure Text Analytics endpoint or key not set".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
struct SentimentRequest<'a> {
    documents: [SentimentDocument<'a>; 1],
}

#[derive(Debug, Serialize)]
struct SentimentDocument<'a> {
    id: &'static str,
    language: &'static str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SentimentResponse {
    #[serde(default)]
    documents: Vec<DocumentSentiment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentSentiment {
    sentiment: SentimentLabel,
    confidence_scores: ConfidenceScores,
}

fn parse_sentiment(body: &str) -> Result<SentimentResult> {
    let response: SentimentResponse = serde_json::from_str(body)?;
    response
        .documents
        .into_iter()
        .next()
        .map(|doc| SentimentResult {
            label: doc.sentiment,
            confidence: doc.confidence_scores,
        })
        .ok_or_else(|| Error::Sentiment("No document sentiment returned".to_string()))
}

#[async_trait]
impl SentimentProvider for AzureSentimentProvider {
    fn name(&self) -> &'static str {
        "Azure Text Analytics"
    }

    async fn analyze(&self, text: &str) -> Result<SentimentResult> {
        let (endpoint, api_key) = self.credentials()?;

        let body = SentimentRequest {
            documents: [SentimentDocument {
                id: "1",
                language: "en",
                text,
            }],
        };

        debug!("Sending sentiment request to Azure Text Analytics");

        let response = self
            .client
            .post(format!("{endpoint}{SENTIMENT_PATH}"))
            .header("Ocp-Apim-Subscription-Key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Text Analytics API error: {} - {}", status, error_text);
            return Err(Error::Sentiment(format!(
                "Text Analytics API error: {} - {}",
                status, error_text
            )));
        }

        let text = response.text().await?;
        parse_sentiment(&text)
    }

    fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }
}
