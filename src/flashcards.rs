//! Flashcard generation with an LLM
//!
//! Prompts ask for a JSON array of `{question, answer?}` objects. Replies are
//! accepted either as a bare array or as an object with a `flashcards` array.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::providers::{CompletionProvider, CompletionRequest};
use crate::types::{CardType, Flashcard, FlashcardSet};

pub const FLASHCARD_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that generates interview flashcards. Always respond with valid JSON.";

/// Upper bound on cards requested in one generation
pub const MAX_CARDS_PER_REQUEST: usize = 50;

/// Mixed behavioral and technical prep cards with STAR-style answers
pub fn interview_prep_prompt(count: usize) -> String {
    format!(
        "Generate {count} high-quality flashcards to help someone prepare for job interviews.\n\
         Each flashcard should be a JSON object with two fields: \"question\" and \"answer\".\n\n\
         - Include both behavioral and technical questions.\n\
         - Use the STAR method (Situation, Task, Action, Result) in behavioral answers.\n\
         - Keep questions concise and realistic.\n\
         - Answers should be clear, practical, and ideally 2–4 sentences long.\n\n\
         Return only a JSON array of the flashcards. No explanations or extra text."
    )
}

/// Cards on one topic. Behavioral cards carry questions only.
pub fn topic_prompt(card_type: CardType, topic: &str, count: usize) -> String {
    match card_type {
        CardType::Behavioral => format!(
            "Generate {count} behavioral interview questions on {topic}. Return a JSON array of \
             objects with only a \"question\" field, no answers. Example: [ {{ \"question\": \"...\" }}, ... ]\n\
             Make sure the questions are relevant to {topic}."
        ),
        CardType::Technical => format!(
            "Generate {count} technical interview flashcards on {topic}. Each should include a \
             \"question\" and \"answer\" in JSON format:\n[\n  {{\n    \"question\": \"...\",\n    \
             \"answer\": \"...\"\n  }},\n  ...\n]\n\
             Make sure the questions are relevant to {topic} and the answers are concise but \
             informative. The flashcards should be strictly technical type only."
        ),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlashcardReply {
    Bare(Vec<Flashcard>),
    Wrapped { flashcards: Vec<Flashcard> },
}

/// Parse an LLM reply into cards
pub fn parse_flashcards(content: &str) -> Result<Vec<Flashcard>> {
    let body = strip_code_fence(content.trim());
    let reply: FlashcardReply = serde_json::from_str(body).map_err(|e| {
        error!("Failed to parse flashcard reply: {} (raw: {})", e, content);
        Error::Completion("Failed to parse the AI response. Please try again.".to_string())
    })?;

    let cards = match reply {
        FlashcardReply::Bare(cards) | FlashcardReply::Wrapped { flashcards: cards } => cards,
    };

    Ok(cards
        .into_iter()
        .filter(|card| !card.question.trim().is_empty())
        .collect())
}

/// Models sometimes wrap JSON in a markdown fence
fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// A user-authored set. Needs a name and at least one card.
pub fn custom_set(name: &str, card_type: CardType, cards: Vec<Flashcard>) -> Result<FlashcardSet> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Please enter a set name".to_string()));
    }
    if cards.is_empty() {
        return Err(Error::InvalidInput("Please add at least one card.".to_string()));
    }
    Ok(FlashcardSet::new(name, "Custom flashcard set", cards).with_card_type(card_type))
}

/// Generates flashcards through a `CompletionProvider`
pub struct FlashcardGenerator<C: CompletionProvider + ?Sized> {
    provider: Arc<C>,
}

impl<C: CompletionProvider + ?Sized> FlashcardGenerator<C> {
    pub fn new(provider: Arc<C>) -> Self {
        Self { provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    /// Run an arbitrary flashcard prompt
    pub async fn generate(&self, prompt: &str) -> Result<Vec<Flashcard>> {
        debug!("Requesting flashcards from {}", self.provider.name());
        let request = CompletionRequest::new(prompt).with_system_prompt(FLASHCARD_SYSTEM_PROMPT);
        let response = self.provider.complete(request).await?;
        parse_flashcards(&response.text)
    }

    /// Generate `count` cards of `card_type` about `topic`
    pub async fn generate_for_topic(
        &self,
        card_type: CardType,
        topic: &str,
        count: usize,
    ) -> Result<Vec<Flashcard>> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(Error::InvalidInput("Please enter a topic".to_string()));
        }
        if count == 0 || count > MAX_CARDS_PER_REQUEST {
            return Err(Error::InvalidInput(format!(
                "card count must be between 1 and {MAX_CARDS_PER_REQUEST}"
            )));
        }

        let cards = self
            .generate(&topic_prompt(card_type, topic, count))
            .await?;
        info!("Generated {} {} flashcards on {}", cards.len(), card_type.as_str(), topic);
        Ok(cards)
    }

    /// Generate cards on `topic` and package them as a named set
    pub async fn generate_set(
        &self,
        name: &str,
        card_type: CardType,
        topic: &str,
        count: usize,
    ) -> Result<FlashcardSet> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Please enter a set name".to_string()));
        }
        let cards = self.generate_for_topic(card_type, topic, count).await?;
        Ok(FlashcardSet::new(name, format!("AI-generated set about {}", topic.trim()), cards)
            .with_card_type(card_type))
    }
}
