//! Conversation backend trait and wire types

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Example, Message, Question};

/// Snapshot of the active question sent with every chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionContext {
    pub id: String,
    pub number: u32,
    #[serde(rename = "type")]
    pub question_type: String,
    pub difficulty: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Example>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<String>>,
}

impl From<&Question> for QuestionContext {
    fn from(question: &Question) -> Self {
        let problem = question.problem.as_ref();
        Self {
            id: question.id.clone(),
            number: question.number,
            question_type: question.question_type.as_str().to_string(),
            difficulty: question.difficulty.as_str().to_string(),
            title: question.title.clone(),
            description: question.description.clone(),
            category: problem.map(|p| p.category.clone()),
            examples: problem.map(|p| p.examples.clone()),
            constraints: problem.map(|p| p.constraints.clone()),
            hints: problem.map(|p| p.hints.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_context: Option<QuestionContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_context: Option<String>,
}

impl ChatMessageRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            session_id: None,
            question_context: None,
            code_context: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_question(mut self, question: &Question) -> Self {
        self.question_context = Some(QuestionContext::from(question));
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code_context = Some(code.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub message: Message,
    pub session_id: String,
}

/// Voice upload; `audio_data` is base64-encoded WAV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceMessageRequest {
    pub audio_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_context: Option<QuestionContext>,
}

impl VoiceMessageRequest {
    pub fn from_wav(wav: &[u8]) -> Self {
        Self {
            audio_data: STANDARD.encode(wav),
            session_id: None,
            question_context: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_question(mut self, question: &Question) -> Self {
        self.question_context = Some(QuestionContext::from(question));
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceMessageResponse {
    pub transcribed_text: String,
    pub ai_response: Message,
    pub session_id: String,
}

/// Server-side view of an interview conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    #[serde(default)]
    pub current_question: Option<serde_json::Value>,
    #[serde(default = "default_question_number")]
    pub question_number: u32,
    #[serde(default = "default_total_questions")]
    pub total_questions: u32,
    #[serde(default = "default_interview_type")]
    pub interview_type: String,
    #[serde(default)]
    pub user_code: Option<String>,
    #[serde(default = "default_programming_language")]
    pub programming_language: String,
}

fn default_question_number() -> u32 {
    1
}

fn default_total_questions() -> u32 {
    5
}

fn default_interview_type() -> String {
    "mock_interview".to_string()
}

fn default_programming_language() -> String {
    "python".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub context: ConversationContext,
    pub message_count: usize,
}

/// Partial update of the server-side context. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question: Option<QuestionContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programming_language: Option<String>,
}

/// Trait for the remote interviewer conversation service
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Get the backend name
    fn name(&self) -> &'static str;

    /// Open a new conversation and return its session id
    async fn create_session(&self) -> Result<String>;

    /// Send one user message and wait for the interviewer's reply
    async fn send_message(&self, request: ChatMessageRequest) -> Result<ChatMessageResponse>;

    /// Liveness probe, never errors
    async fn health(&self) -> bool;

    async fn send_voice_message(&self, _request: VoiceMessageRequest) -> Result<VoiceMessageResponse> {
        Err(Error::ProviderNotConfigured(format!(
            "{} does not accept voice messages",
            self.name()
        )))
    }

    async fn conversation_history(&self, _session_id: &str) -> Result<ConversationHistory> {
        Err(Error::ProviderNotConfigured(format!(
            "{} does not keep conversation history",
            self.name()
        )))
    }

    async fn update_session_context(&self, _session_id: &str, _update: &ContextUpdate) -> Result<()> {
        Err(Error::ProviderNotConfigured(format!(
            "{} does not accept context updates",
            self.name()
        )))
    }
}
