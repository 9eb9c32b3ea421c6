//! HTTP client for the interviewer conversation service

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::{Error, Result};

use super::chat::{
    ChatBackend, ChatMessageRequest, ChatMessageResponse, ContextUpdate, ConversationHistory,
    VoiceMessageRequest, VoiceMessageResponse,
};

const API_PREFIX: &str = "/api/v1";

/// `ChatBackend` speaking JSON over HTTP
pub struct HttpChatBackend {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session_id: String,
}

impl HttpChatBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(Error::Config("API base URL is empty".to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.api_base_url.clone(), config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    async fn read_json<T: DeserializeOwned>(&self, endpoint: &str, response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = extract_detail(&body)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            error!("API Error {} {}: {}", endpoint, status, detail);
            return Err(Error::Api {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response.json().await?)
    }
}

/// Pull a human-readable message out of an error body.
///
/// Prefers a JSON `detail` or `message` field, then the raw body.
pub fn extract_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => return Some(s.clone()),
                Some(other) if !other.is_null() => return Some(other.to_string()),
                _ => {}
            }
        }
    }
    Some(body.to_string())
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn create_session(&self) -> Result<String> {
        let url = self.url("/chat/session");
        debug!("API Request: POST {}", url);
        let response = self.client.post(&url).send().await?;
        let session: SessionResponse = self.read_json("/chat/session", response).await?;
        Ok(session.session_id)
    }

    async fn send_message(&self, request: ChatMessageRequest) -> Result<ChatMessageResponse> {
        let url = self.url("/chat/message");
        debug!("API Request: POST {}", url);
        let response = self.client.post(&url).json(&request).send().await?;
        self.read_json("/chat/message", response).await
    }

    async fn health(&self) -> bool {
        let url = self.url("/health");
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Health check failed: {}", e);
                false
            }
        }
    }

    async fn send_voice_message(&self, request: VoiceMessageRequest) -> Result<VoiceMessageResponse> {
        let url = self.url("/chat/voice");
        debug!("API Request: POST {} ({} bytes base64)", url, request.audio_data.len());
        let response = self.client.post(&url).json(&request).send().await?;
        self.read_json("/chat/voice", response).await
    }

    async fn conversation_history(&self, session_id: &str) -> Result<ConversationHistory> {
        let url = self.url(&format!("/chat/conversation/{session_id}"));
        debug!("API Request: GET {}", url);
        let response = self.client.get(&url).send().await?;
        self.read_json("/chat/conversation", response).await
    }

    async fn update_session_context(&self, session_id: &str, update: &ContextUpdate) -> Result<()> {
        let url = self.url(&format!("/chat/session/{session_id}/context"));
        debug!("API Request: PUT {}", url);
        let response = self.client.put(&url).json(update).send().await?;
        let _: serde_json::Value = self.read_json("/chat/session/context", response).await?;
        Ok(())
    }
}
