//! Spoken answer evaluation for flashcard practice
//!
//! A recorded answer is transcribed, behavioral answers are scored for
//! sentiment, and every answer gets written feedback from the LLM.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::{
    CompletionProvider, CompletionRequest, SentimentProvider, SentimentResult,
    TranscriptionProvider, TranscriptionRequest,
};
use crate::types::CardType;
use crate::voice::VoiceRecording;

/// Reply budget for feedback, matching the interviewer backend
pub const FEEDBACK_MAX_TOKENS: u32 = 500;

pub const EVALUATION_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that evaluates interview answers. Always respond with clear, concise feedback.";

/// Prompt asking the LLM to critique a transcript
pub fn evaluation_prompt(card_type: CardType, transcript: &str) -> String {
    match card_type {
        CardType::Behavioral => format!(
            "Evaluate this behavioral interview response for tone, confidence, and clarity:\n\n\"{transcript}\""
        ),
        CardType::Technical => format!(
            "Evaluate this technical interview response for correctness and completeness:\n\n\"{transcript}\""
        ),
    }
}

/// Everything learned about one spoken answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerFeedback {
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentResult>,
    pub feedback: String,
}

/// A practiced answer as kept in local history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeAttempt {
    pub id: Uuid,
    pub card_type: CardType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    pub feedback: String,
    pub duration_secs: u32,
    pub created_at: DateTime<Utc>,
}

impl PracticeAttempt {
    pub fn new(
        card_type: CardType,
        question_text: Option<String>,
        feedback: &AnswerFeedback,
        duration_secs: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_type,
            question_text,
            transcript: feedback.transcript.clone(),
            sentiment: feedback
                .sentiment
                .as_ref()
                .map(|s| s.label.as_str().to_string()),
            feedback: feedback.feedback.clone(),
            duration_secs,
            created_at: Utc::now(),
        }
    }
}

/// Transcribes and critiques recorded answers
pub struct AnswerEvaluator {
    transcription: Arc<dyn TranscriptionProvider>,
    completion: Arc<dyn CompletionProvider>,
    sentiment: Option<Arc<dyn SentimentProvider>>,
}

impl AnswerEvaluator {
    pub fn new(
        transcription: Arc<dyn TranscriptionProvider>,
        completion: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            transcription,
            completion,
            sentiment: None,
        }
    }

    pub fn with_sentiment(mut self, sentiment: Arc<dyn SentimentProvider>) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.transcription.is_configured() && self.completion.is_configured()
    }

    /// Evaluate a recording saved by the voice recorder
    pub async fn evaluate_recording(
        &self,
        card_type: CardType,
        recording: &VoiceRecording,
    ) -> Result<AnswerFeedback> {
        let wav = recording.read_bytes()?;
        self.evaluate(card_type, wav).await
    }

    /// Evaluate WAV bytes
    pub async fn evaluate(&self, card_type: CardType, wav: Vec<u8>) -> Result<AnswerFeedback> {
        let transcription = self
            .transcription
            .transcribe(TranscriptionRequest::new(wav).with_language("en"))
            .await?;

        let transcript = transcription.text.trim().to_string();
        if transcript.is_empty() {
            return Err(Error::Transcription("No speech recognized".to_string()));
        }
        debug!("Transcript: {}", transcript);

        self.evaluate_transcript(card_type, transcript).await
    }

    /// Score and critique an existing transcript
    pub async fn evaluate_transcript(
        &self,
        card_type: CardType,
        transcript: String,
    ) -> Result<AnswerFeedback> {
        let sentiment = match (&self.sentiment, card_type) {
            (Some(provider), CardType::Behavioral) if provider.is_configured() => {
                match provider.analyze(&transcript).await {
                    Ok(result) => Some(result),
                    Err(e) => {
                        warn!("Error analyzing sentiment: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        let request = CompletionRequest::new(evaluation_prompt(card_type, &transcript))
            .with_system_prompt(EVALUATION_SYSTEM_PROMPT)
            .with_max_tokens(FEEDBACK_MAX_TOKENS);
        let feedback = self.completion.complete(request).await?.text.trim().to_string();

        info!(
            "Evaluated {} answer ({} chars, sentiment: {})",
            card_type.as_str(),
            transcript.len(),
            sentiment.is_some()
        );

        Ok(AnswerFeedback {
            transcript,
            sentiment,
            feedback,
        })
    }
}
