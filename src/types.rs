//! Core types used throughout Intervue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for flashcard sets
pub type FlashcardSetId = Uuid;

/// Problem difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn all() -> &'static [Difficulty] {
        &[Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editor language, one starter template exists per language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
    JavaScript,
    Java,
    Cpp,
}

impl Language {
    pub fn all() -> &'static [Language] {
        &[
            Language::Python,
            Language::JavaScript,
            Language::Java,
            Language::Cpp,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Java => "java",
            Self::Cpp => "cpp",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "python" => Some(Self::Python),
            "javascript" | "js" => Some(Self::JavaScript),
            "java" => Some(Self::Java),
            "cpp" | "c++" => Some(Self::Cpp),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Code editor color theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorTheme {
    Light,
    #[default]
    Dark,
}

/// Kind of interview question
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    #[default]
    #[serde(rename = "Coding Challenge")]
    CodingChallenge,
    #[serde(rename = "System Design")]
    SystemDesign,
    #[serde(rename = "Behavioral")]
    Behavioral,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodingChallenge => "Coding Challenge",
            Self::SystemDesign => "System Design",
            Self::Behavioral => "Behavioral",
        }
    }
}

/// Worked example attached to a problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub input: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Starter templates for the four supported editor languages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarterCode {
    pub python: String,
    pub javascript: String,
    pub java: String,
    pub cpp: String,
}

impl StarterCode {
    /// Template for `language`, falling back to the python template when empty
    pub fn get(&self, language: Language) -> &str {
        let code = match language {
            Language::Python => &self.python,
            Language::JavaScript => &self.javascript,
            Language::Java => &self.java,
            Language::Cpp => &self.cpp,
        };
        if code.is_empty() { &self.python } else { code }
    }
}

/// A catalog problem, read-only at runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    pub starter_code: StarterCode,
}

/// A question as presented in one interview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    /// 1-based ordinal within the interview
    pub number: u32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub title: String,
    /// Problem description with examples and constraints appended
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starter_code: Option<StarterCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<Problem>,
}

impl Question {
    pub fn category(&self) -> Option<&str> {
        self.problem.as_ref().map(|p| p.category.as_str())
    }
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Ai,
}

/// A single entry in the interview chat log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub role: MessageRole,
    pub content: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Ai, content)
    }

    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            audio_url: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_audio_url(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }
}

/// Signed-in user as returned by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub uid: String,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
        }
    }
}

/// Flashcard flavor, controls prompts and answer evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    #[default]
    Behavioral,
    Technical,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Behavioral => "behavioral",
            Self::Technical => "technical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "behavioral" => Some(Self::Behavioral),
            "technical" => Some(Self::Technical),
            _ => None,
        }
    }
}

/// A single question/answer card. Behavioral cards may omit the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl Flashcard {
    pub fn new(question: impl Into<String>, answer: Option<String>) -> Self {
        Self {
            question: question.into(),
            answer,
        }
    }
}

/// A named, user-owned collection of flashcards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardSet {
    pub id: FlashcardSetId,
    pub name: String,
    pub description: String,
    pub cards: Vec<Flashcard>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_type: Option<CardType>,
}

impl FlashcardSet {
    pub fn new(name: impl Into<String>, description: impl Into<String>, cards: Vec<Flashcard>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            cards,
            created_at: Utc::now(),
            card_type: None,
        }
    }

    pub fn with_card_type(mut self, card_type: CardType) -> Self {
        self.card_type = Some(card_type);
        self
    }
}

/// Serde adapter for message timestamps.
///
/// The conversation backend emits naive ISO-8601 strings (no offset); those are
/// read as UTC. Output is always RFC 3339.
pub mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    /// RFC 3339, or a naive ISO-8601 time in the host's local zone
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        // earliest() picks the first instant of a repeated DST hour
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }
}
