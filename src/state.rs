//! Interview state aggregate
//!
//! `InterviewState` is never mutated in place. Every transition borrows the
//! current value and returns a new one, so whoever owns the state decides which
//! version is current.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EditorTheme, Language, Message};

pub const DEFAULT_FONT_SIZE: u32 = 14;
pub const MIN_FONT_SIZE: u32 = 10;
pub const MAX_FONT_SIZE: u32 = 24;

/// Snapshot of one mock interview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewState {
    current_question: u32,
    total_questions: u32,
    start_time: DateTime<Utc>,
    is_active: bool,
    is_ended: bool,
    current_code: String,
    language: Language,
    theme: EditorTheme,
    font_size: u32,
    messages: Vec<Message>,
}

impl InterviewState {
    /// Fresh state positioned on question 1. `total_questions` is at least 1.
    pub fn new(total_questions: u32, language: Language, starter_code: impl Into<String>) -> Self {
        Self {
            current_question: 1,
            total_questions: total_questions.max(1),
            start_time: Utc::now(),
            is_active: true,
            is_ended: false,
            current_code: starter_code.into(),
            language,
            theme: EditorTheme::default(),
            font_size: DEFAULT_FONT_SIZE,
            messages: Vec::new(),
        }
    }

    pub fn current_question(&self) -> u32 {
        self.current_question
    }

    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_ended(&self) -> bool {
        self.is_ended
    }

    pub fn current_code(&self) -> &str {
        &self.current_code
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn theme(&self) -> EditorTheme {
        self.theme
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn has_next_question(&self) -> bool {
        self.current_question < self.total_questions
    }

    /// Pause or resume. Ended interviews stay ended.
    pub fn toggle_active(&self) -> Self {
        let mut next = self.clone();
        if !next.is_ended {
            next.is_active = !next.is_active;
        }
        next
    }

    pub fn end(&self) -> Self {
        let mut next = self.clone();
        next.is_active = false;
        next.is_ended = true;
        next
    }

    pub fn with_code(&self, code: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.current_code = code.into();
        next
    }

    /// Switch language; the buffer is replaced by that language's starter code
    pub fn with_language(&self, language: Language, starter_code: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.language = language;
        next.current_code = starter_code.into();
        next
    }

    pub fn with_theme(&self, theme: EditorTheme) -> Self {
        let mut next = self.clone();
        next.theme = theme;
        next
    }

    pub fn with_font_size(&self, font_size: u32) -> Self {
        let mut next = self.clone();
        next.font_size = font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        next
    }

    pub fn with_message(&self, message: Message) -> Self {
        self.with_messages(std::iter::once(message))
    }

    /// Append messages, nudging timestamps forward so the log stays strictly ordered
    pub fn with_messages(&self, messages: impl IntoIterator<Item = Message>) -> Self {
        let mut next = self.clone();
        for mut message in messages {
            if let Some(last) = next.messages.last()
                && message.timestamp <= last.timestamp
            {
                message.timestamp = last.timestamp + Duration::milliseconds(1);
            }
            next.messages.push(message);
        }
        next
    }

    /// Move to the following question with a fresh buffer and an announcement.
    ///
    /// Returns an unchanged copy when already on the last question.
    pub fn with_next_question(&self, starter_code: impl Into<String>, announcement: Message) -> Self {
        if !self.has_next_question() {
            return self.clone();
        }
        let mut next = self.with_message(announcement);
        next.current_question += 1;
        next.current_code = starter_code.into();
        next
    }
}
