//! Transcription provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Request for transcription of a recorded answer
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    /// Complete WAV file contents
    pub wav: Vec<u8>,
    /// Optional language hint (ISO 639-1 code, e.g., "en")
    pub language: Option<String>,
    /// Optional prompt to guide transcription
    pub prompt: Option<String>,
}

impl TranscriptionRequest {
    pub fn new(wav: Vec<u8>) -> Self {
        Self {
            wav,
            language: None,
            prompt: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// Response from transcription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    /// Transcribed text
    pub text: String,
    /// Detected language if available
    pub language: Option<String>,
    /// Duration of audio in milliseconds, when the provider reports it
    pub duration_ms: Option<u64>,
}

/// Trait for speech-to-text providers
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Transcribe audio to text
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionResponse>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}
