//! Provider abstraction layer for the conversation backend, completion,
//! transcription and sentiment services
mod backend;
mod chat;
mod completion;
mod openai;
mod sentiment;
mod transcription;

pub use backend::{HttpChatBackend, extract_detail};
pub use chat::{
    ChatBackend, ChatMessageRequest, ChatMessageResponse, ContextUpdate, ConversationContext,
    ConversationHistory, QuestionContext, VoiceMessageRequest, VoiceMessageResponse,
};
pub use completion::{
    CompletionProvider, CompletionRequest, CompletionResponse, DEFAULT_TEMPERATURE, TokenUsage,
};
pub use openai::{OpenAICompletionProvider, OpenAITranscriptionProvider};
pub use sentiment::{
    AzureSentimentProvider, ConfidenceScores, SentimentLabel, SentimentProvider, SentimentResult,
};
pub use transcription::{TranscriptionProvider, TranscriptionRequest, TranscriptionResponse};
