//! Intervue Core - mock interview engine
//!
//! Drives a timed coding interview against a remote interviewer service:
//! draws a difficulty-balanced question set, keeps the editor and chat state,
//! and records spoken answers. Also ships flashcard generation and spoken
//! answer feedback for interview practice.

pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod ffi;
pub mod flashcards;
pub mod migrations;
pub mod providers;
pub mod session;
pub mod state;
pub mod storage;
pub mod types;
pub mod voice;

pub use error::{Error, Result};
pub use types::*;

// Export FFI functions at crate root for C hosts
pub use ffi::*;

/// Re-export the main engine components for convenience
pub use audio::{AudioSource, CapturedAudio, MicrophoneStream};
pub use catalog::{DifficultyMix, ProblemCatalog};
pub use config::Config;
pub use evaluation::{AnswerEvaluator, AnswerFeedback, PracticeAttempt};
pub use flashcards::FlashcardGenerator;
pub use providers::{ChatBackend, CompletionProvider, HttpChatBackend, TranscriptionProvider};
pub use session::{AdvanceOutcome, InterviewSession, SendOutcome, SessionOptions};
pub use state::InterviewState;
pub use storage::Storage;
pub use voice::{PermissionState, VoiceRecorder, VoiceRecording};
