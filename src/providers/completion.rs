//! Completion provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default sampling temperature for flashcard and feedback generation
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Request for a single-turn chat completion
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// User prompt
    pub prompt: String,
    /// Optional system prompt
    pub system_prompt: Option<String>,
    pub temperature: f32,
    /// Max tokens to generate
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

/// Response from completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Token usage information
    pub usage: Option<TokenUsage>,
    /// Model used for completion
    pub model: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Trait for text generation providers
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Generate a completion for the request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}
